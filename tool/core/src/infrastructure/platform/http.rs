// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// HTTP Platform Adapter
//
// Anti-Corruption Layer for the platform's OAuth2 token endpoint and the
// Names and Roles Provisioning Service (NRPS v2) membership endpoint.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::domain::membership::{Member, MemberStatus, Membership, MembershipContext};
use crate::domain::platform::{
    AccessToken, PlatformClient, PlatformError, TokenRequest, CLIENT_ASSERTION_TYPE,
};

pub const MEMBERSHIP_CONTAINER_MEDIA_TYPE: &str =
    "application/vnd.ims.lti-nrps.v2.membershipcontainer+json";

/// Upper bound on a single platform round trip.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Used when the token response omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME_SECONDS: i64 = 3600;

pub struct HttpPlatformClient {
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
}

#[derive(Deserialize)]
struct MembershipContainer {
    context: ContainerContext,
    #[serde(default)]
    members: Vec<ContainerMember>,
}

#[derive(Deserialize)]
struct ContainerContext {
    id: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Deserialize)]
struct ContainerMember {
    user_id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    given_name: Option<String>,
    #[serde(default)]
    family_name: Option<String>,
    #[serde(default)]
    roles: Vec<String>,
    #[serde(default)]
    status: Option<String>,
}

impl HttpPlatformClient {
    pub fn new() -> Result<Self, PlatformError> {
        Self::with_timeout(DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, PlatformError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PlatformError::Network(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PlatformClient for HttpPlatformClient {
    async fn request_token(&self, request: &TokenRequest) -> Result<AccessToken, PlatformError> {
        let scope = request.scopes.join(" ");
        let form = [
            ("grant_type", "client_credentials"),
            ("client_assertion_type", CLIENT_ASSERTION_TYPE),
            ("client_assertion", request.client_assertion.as_str()),
            ("scope", scope.as_str()),
        ];

        debug!(endpoint = %request.token_endpoint, scope = %scope, "Requesting service token");

        let response = self
            .client
            .post(request.token_endpoint.clone())
            .header("Accept", "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|e| PlatformError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PlatformError::Network(e.to_string()))?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "Token endpoint rejected request");
            // 400 is how OAuth2 servers report invalid_client / invalid_grant.
            return Err(if status == 400 || status == 401 || status == 403 {
                PlatformError::Authentication(format!("HTTP {}: {}", status.as_u16(), body))
            } else {
                PlatformError::Upstream {
                    status: status.as_u16(),
                    body,
                }
            });
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| PlatformError::Parse(format!("token response: {}", e)))?;

        let scopes = match token.scope {
            Some(granted) => granted.split_whitespace().map(str::to_string).collect(),
            None => request.scopes.clone(),
        };

        AccessToken::new(
            token.access_token,
            token.token_type.unwrap_or_else(|| "Bearer".to_string()),
            scopes,
            token.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECONDS),
            chrono::Utc::now(),
        )
    }

    async fn fetch_membership(
        &self,
        endpoint: &Url,
        token: &AccessToken,
    ) -> Result<Membership, PlatformError> {
        debug!(endpoint = %endpoint, "Fetching context membership");

        let response = self
            .client
            .get(endpoint.clone())
            .header("Accept", MEMBERSHIP_CONTAINER_MEDIA_TYPE)
            .header("Authorization", token.authorization())
            .send()
            .await
            .map_err(|e| PlatformError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PlatformError::Network(e.to_string()))?;

        if status == 401 || status == 403 {
            return Err(PlatformError::Authentication(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }
        if !status.is_success() {
            return Err(PlatformError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let container: MembershipContainer = serde_json::from_str(&body)
            .map_err(|e| PlatformError::Parse(format!("membership container: {}", e)))?;

        Ok(container.into_membership())
    }
}

impl MembershipContainer {
    fn into_membership(self) -> Membership {
        let ContainerContext { id, label, title } = self.context;
        let title = title
            .or_else(|| label.clone())
            .unwrap_or_else(|| id.clone());

        Membership {
            context: MembershipContext { id, label, title },
            members: self.members.into_iter().map(ContainerMember::into_member).collect(),
        }
    }
}

impl ContainerMember {
    fn into_member(self) -> Member {
        let name = match (self.name, self.given_name, self.family_name) {
            (Some(name), _, _) if !name.trim().is_empty() => name,
            (_, Some(given), Some(family)) => format!("{} {}", given, family),
            (_, Some(given), None) => given,
            (_, None, Some(family)) => family,
            _ => self.user_id.clone(),
        };

        let status = match self.status.as_deref() {
            Some("Inactive") => MemberStatus::Inactive,
            Some("Deleted") => MemberStatus::Deleted,
            _ => MemberStatus::Active,
        };

        Member {
            user_id: self.user_id,
            name,
            roles: self.roles,
            status,
        }
    }
}
