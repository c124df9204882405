// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Platform
//!
//! Domain interface to a learning platform's service endpoints.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Anti-corruption layer between connectors and platform HTTP APIs

// The OAuth2 token endpoint and the NRPS membership endpoint are both behind
// `PlatformClient` so connectors can be exercised without a network.
// Implementation in infrastructure/platform/.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::domain::membership::Membership;

pub const NRPS_SCOPE: &str =
    "https://purl.imsglobal.org/spec/lti-nrps/scope/contextmembership.readonly";

pub const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

/// Tokens are treated as expired this long before the platform says so.
pub const TOKEN_EXPIRY_SKEW_SECONDS: i64 = 30;

/// Lifetime of a client assertion.
const ASSERTION_TTL_SECONDS: i64 = 300;

/// Domain interface for platform service calls
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Exchange a signed client assertion for an access token.
    async fn request_token(&self, request: &TokenRequest) -> Result<AccessToken, PlatformError>;

    /// Fetch the membership container at `endpoint`.
    async fn fetch_membership(
        &self,
        endpoint: &Url,
        token: &AccessToken,
    ) -> Result<Membership, PlatformError>;
}

/// Client-credentials grant with a JWT client assertion.
#[derive(Debug, Clone)]
pub struct TokenRequest {
    pub token_endpoint: Url,
    pub client_assertion: String,
    pub scopes: Vec<String>,
}

/// Claims of the JWT the tool signs to authenticate at the token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientAssertionClaims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

impl ClientAssertionClaims {
    pub fn new(client_id: &str, token_endpoint: &Url, now: DateTime<Utc>) -> Self {
        Self {
            iss: client_id.to_string(),
            sub: client_id.to_string(),
            aud: token_endpoint.to_string(),
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_TTL_SECONDS,
            jti: Uuid::new_v4().to_string(),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub value: String,
    pub token_type: String,
    pub scopes: Vec<String>,
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token_type", &self.token_type)
            .field("scopes", &self.scopes)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

impl AccessToken {
    /// Fails with [`PlatformError::Parse`] when `now + expires_in_seconds`
    /// is not a representable instant.
    pub fn new(
        value: impl Into<String>,
        token_type: impl Into<String>,
        scopes: Vec<String>,
        expires_in_seconds: i64,
        now: DateTime<Utc>,
    ) -> Result<Self, PlatformError> {
        let expires_at = Duration::try_seconds(expires_in_seconds)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                PlatformError::Parse(format!(
                    "token lifetime out of range: expires_in={}",
                    expires_in_seconds
                ))
            })?;

        Ok(Self {
            value: value.into(),
            token_type: token_type.into(),
            scopes,
            expires_at,
        })
    }

    /// Usable at `now`, allowing for clock skew.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(TOKEN_EXPIRY_SKEW_SECONDS) < self.expires_at
    }

    /// `Authorization` header value.
    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.value)
    }
}

/// Errors that can occur during platform service calls
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Platform returned HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Failed to parse platform response: {0}")]
    Parse(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_freshness_respects_skew() {
        let now = Utc::now();
        let token = AccessToken::new("t", "Bearer", vec![NRPS_SCOPE.to_string()], 3600, now).unwrap();
        assert!(token.is_fresh(now));
        assert!(!token.is_fresh(now + Duration::seconds(3600 - TOKEN_EXPIRY_SKEW_SECONDS)));
    }

    #[test]
    fn test_unrepresentable_lifetime_is_parse_error() {
        let now = Utc::now();
        for expires_in in [i64::MAX, i64::MIN] {
            let err = AccessToken::new("t", "Bearer", vec![], expires_in, now).unwrap_err();
            assert!(matches!(err, PlatformError::Parse(_)), "got {:?}", err);
        }
    }

    #[test]
    fn test_debug_hides_token_value() {
        let token = AccessToken::new("secret-value", "Bearer", vec![], 60, Utc::now()).unwrap();
        assert!(!format!("{:?}", token).contains("secret-value"));
    }

    #[test]
    fn test_assertion_claims_bind_client_and_endpoint() {
        let endpoint = Url::parse("https://platform.example/token").unwrap();
        let now = Utc::now();
        let claims = ClientAssertionClaims::new("abc", &endpoint, now);
        assert_eq!(claims.iss, "abc");
        assert_eq!(claims.sub, "abc");
        assert_eq!(claims.aud, "https://platform.example/token");
        assert_eq!(claims.exp - claims.iat, ASSERTION_TTL_SECONDS);
    }
}
