// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Launch-Scoped Connectors
//!
//! A connector is the request-scoped handle that turns a completed launch
//! into authorized calls against the platform's services. It is built per
//! request by [`ConnectorFactory`], never shared and never persisted.
//!
//! ## State machine
//!
//! ```text
//! Connector ──set_signing_key──▶ KeyedConnector ──upgrade──▶ ServiceConnector
//!  (Created)                       (Keyed)                     (ServiceReady ⇄ Authenticated)
//! ```
//!
//! The forward edges are typestates: a method that needs a key or a service
//! binding only exists on the type that has one. The last edge is runtime
//! state ([`AuthState`]) because it moves both ways: the first
//! `get_membership` call acquires a token, and an authentication failure or
//! an expired token sends the connector back to `ServiceReady`.
//!
//! No network I/O happens before `get_membership`.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use crate::domain::key::{KeyError, SigningKey, DEFAULT_KEY_ID};
use crate::domain::launch::{LaunchError, LaunchId, LaunchSession, LaunchSessionProvider};
use crate::domain::membership::Membership;
use crate::domain::platform::{
    AccessToken, ClientAssertionClaims, PlatformClient, PlatformError, TokenRequest, NRPS_SCOPE,
};
use crate::domain::registration::{absolute_uri, Deployment, Registration};
use crate::domain::repository::{RegistrationRepository, RepositoryError};

/// NRPS service version this connector speaks.
pub const NRPS_SERVICE_VERSION: &str = "2.0";

/// Platform services a keyed connector can be upgraded to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceCapability {
    /// Names and Roles Provisioning Service.
    NamesRoles,
    /// Assignment and Grade Services. Availability checking only.
    AssignmentGrades,
}

impl std::fmt::Display for ServiceCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceCapability::NamesRoles => write!(f, "names-and-roles"),
            ServiceCapability::AssignmentGrades => write!(f, "assignment-and-grades"),
        }
    }
}

/// Observable connector state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorState {
    Created,
    Keyed,
    ServiceReady,
    Authenticated,
}

/// Authentication state of an upgraded connector.
#[derive(Debug, Clone, Default)]
pub enum AuthState {
    #[default]
    ServiceReady,
    Authenticated(AccessToken),
}

/// Service endpoints resolved from the launch claims during upgrade.
#[derive(Debug, Clone)]
enum ServiceBinding {
    NamesRoles { memberships_url: Url },
    AssignmentGrades { scopes: Vec<String> },
}

impl ServiceBinding {
    fn capability(&self) -> ServiceCapability {
        match self {
            ServiceBinding::NamesRoles { .. } => ServiceCapability::NamesRoles,
            ServiceBinding::AssignmentGrades { .. } => ServiceCapability::AssignmentGrades,
        }
    }

    fn scopes(&self) -> Vec<String> {
        match self {
            ServiceBinding::NamesRoles { .. } => vec![NRPS_SCOPE.to_string()],
            ServiceBinding::AssignmentGrades { scopes } => scopes.clone(),
        }
    }
}

/// Builds request-scoped connectors from a completed launch.
#[derive(Clone)]
pub struct ConnectorFactory {
    store: Arc<dyn RegistrationRepository>,
    sessions: Arc<dyn LaunchSessionProvider>,
    platform: Arc<dyn PlatformClient>,
}

impl ConnectorFactory {
    pub fn new(
        store: Arc<dyn RegistrationRepository>,
        sessions: Arc<dyn LaunchSessionProvider>,
        platform: Arc<dyn PlatformClient>,
    ) -> Self {
        Self {
            store,
            sessions,
            platform,
        }
    }

    /// Build a connector for `launch_id`.
    ///
    /// The launch must be known, completed and unexpired, and its registration
    /// and deployment must be in the store. `key_id` defaults to
    /// [`DEFAULT_KEY_ID`].
    pub async fn connect(
        &self,
        launch_id: &LaunchId,
        key_id: Option<&str>,
    ) -> Result<Connector, ConnectorError> {
        let launch = match self.sessions.find_launch(launch_id).await? {
            Some(launch) if launch.is_usable(Utc::now()) => launch,
            Some(launch) => {
                debug!(launch_id = %launch_id, status = ?launch.status, "Launch not usable");
                return Err(ConnectorError::LaunchNotFound(launch_id.to_string()));
            }
            None => return Err(ConnectorError::LaunchNotFound(launch_id.to_string())),
        };

        let registration = self
            .store
            .find_registration(&launch.issuer)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound(_) => {
                    ConnectorError::RegistrationNotFound(launch.issuer.clone())
                }
                other => ConnectorError::Repository(other),
            })?;

        let deployment = self
            .store
            .find_deployment(&launch.issuer, &launch.deployment_id)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound(_) => ConnectorError::DeploymentNotFound {
                    issuer: launch.issuer.clone(),
                    deployment_id: launch.deployment_id.clone(),
                },
                other => ConnectorError::Repository(other),
            })?;

        let key_id = key_id.unwrap_or(DEFAULT_KEY_ID).to_string();
        debug!(launch_id = %launch_id, issuer = %registration.issuer, key_id = %key_id, "Connector created");

        Ok(Connector {
            launch,
            registration,
            deployment,
            key_id,
            platform: Arc::clone(&self.platform),
        })
    }
}

/// Connector bound to a launch, without a signing key yet.
pub struct Connector {
    launch: LaunchSession,
    registration: Registration,
    deployment: Deployment,
    key_id: String,
    platform: Arc<dyn PlatformClient>,
}

impl Connector {
    pub fn launch_id(&self) -> &LaunchId {
        &self.launch.id
    }

    pub fn registration(&self) -> &Registration {
        &self.registration
    }

    pub fn deployment(&self) -> &Deployment {
        &self.deployment
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn state(&self) -> ConnectorState {
        ConnectorState::Created
    }

    /// Attach the private key (PEM) the tool signs client assertions with.
    pub fn set_signing_key(self, pem: &str) -> Result<KeyedConnector, ConnectorError> {
        let key = SigningKey::from_pem(self.key_id.clone(), pem)?;
        Ok(KeyedConnector { inner: self, key })
    }

    /// Attach an already parsed key. Its `kid` must match the connector's.
    pub fn with_signing_key(self, key: SigningKey) -> Result<KeyedConnector, ConnectorError> {
        if key.kid() != self.key_id {
            return Err(ConnectorError::InvalidKey(format!(
                "key '{}' does not match requested key id '{}'",
                key.kid(),
                self.key_id
            )));
        }
        Ok(KeyedConnector { inner: self, key })
    }
}

/// Connector holding a signing key; can be upgraded to a service.
pub struct KeyedConnector {
    inner: Connector,
    key: SigningKey,
}

impl KeyedConnector {
    pub fn launch_id(&self) -> &LaunchId {
        self.inner.launch_id()
    }

    pub fn state(&self) -> ConnectorState {
        ConnectorState::Keyed
    }

    /// Whether the launch grants `capability`. Never touches the network.
    pub fn supports(&self, capability: ServiceCapability) -> bool {
        self.bind(capability).is_ok()
    }

    pub fn upgrade(self, capability: ServiceCapability) -> Result<ServiceConnector, ConnectorError> {
        let binding = self.bind(capability)?;
        debug!(launch_id = %self.inner.launch.id, capability = %capability, "Connector upgraded");
        Ok(ServiceConnector {
            inner: self.inner,
            key: self.key,
            binding,
            auth: AuthState::ServiceReady,
        })
    }

    pub fn upgrade_nrps(self) -> Result<ServiceConnector, ConnectorError> {
        self.upgrade(ServiceCapability::NamesRoles)
    }

    fn bind(&self, capability: ServiceCapability) -> Result<ServiceBinding, ConnectorError> {
        let claims = &self.inner.launch.claims;
        match capability {
            ServiceCapability::NamesRoles => {
                let claim = claims.names_role_service.as_ref().ok_or_else(|| {
                    ConnectorError::ServiceNotAvailable(
                        "launch carries no names and roles service claim".to_string(),
                    )
                })?;

                if !claim.service_versions.iter().any(|v| v == NRPS_SERVICE_VERSION) {
                    return Err(ConnectorError::ServiceNotAvailable(format!(
                        "unsupported names and roles service versions {:?}",
                        claim.service_versions
                    )));
                }

                let memberships_url =
                    absolute_uri("context_memberships_url", &claim.context_memberships_url)
                        .map_err(|e| ConnectorError::ServiceNotAvailable(e.to_string()))?;

                Ok(ServiceBinding::NamesRoles { memberships_url })
            }
            ServiceCapability::AssignmentGrades => {
                let claim = claims.assignment_grade_service.as_ref().ok_or_else(|| {
                    ConnectorError::ServiceNotAvailable(
                        "launch carries no assignment and grade service claim".to_string(),
                    )
                })?;

                if claim.scope.is_empty() {
                    return Err(ConnectorError::ServiceNotAvailable(
                        "assignment and grade service claim grants no scope".to_string(),
                    ));
                }

                Ok(ServiceBinding::AssignmentGrades {
                    scopes: claim.scope.clone(),
                })
            }
        }
    }
}

/// Connector upgraded to one platform service.
pub struct ServiceConnector {
    inner: Connector,
    key: SigningKey,
    binding: ServiceBinding,
    auth: AuthState,
}

impl ServiceConnector {
    pub fn launch_id(&self) -> &LaunchId {
        self.inner.launch_id()
    }

    pub fn capability(&self) -> ServiceCapability {
        self.binding.capability()
    }

    pub fn auth_state(&self) -> &AuthState {
        &self.auth
    }

    /// `Authenticated` only while the cached token is still fresh.
    pub fn state(&self) -> ConnectorState {
        match &self.auth {
            AuthState::Authenticated(token) if token.is_fresh(Utc::now()) => {
                ConnectorState::Authenticated
            }
            _ => ConnectorState::ServiceReady,
        }
    }

    /// Fetch the course roster for the launch's context.
    pub async fn get_membership(&mut self) -> Result<Membership, ConnectorError> {
        let memberships_url = match &self.binding {
            ServiceBinding::NamesRoles { memberships_url } => memberships_url.clone(),
            other => {
                return Err(ConnectorError::ServiceNotAvailable(format!(
                    "connector is upgraded to {}, not names-and-roles",
                    other.capability()
                )))
            }
        };

        let token = self.access_token().await?;
        let platform = Arc::clone(&self.inner.platform);

        match platform.fetch_membership(&memberships_url, &token).await {
            Ok(membership) => {
                info!(
                    launch_id = %self.inner.launch.id,
                    context = %membership.context.id,
                    members = membership.members.len(),
                    "Fetched context membership"
                );
                Ok(membership)
            }
            Err(e) => {
                if matches!(e, PlatformError::Authentication(_)) {
                    warn!(launch_id = %self.inner.launch.id, "Membership request rejected, discarding token");
                    self.auth = AuthState::ServiceReady;
                }
                Err(e.into())
            }
        }
    }

    /// Cached token if still fresh, otherwise a new one from the token endpoint.
    async fn access_token(&mut self) -> Result<AccessToken, ConnectorError> {
        let now = Utc::now();
        if let AuthState::Authenticated(token) = &self.auth {
            if token.is_fresh(now) {
                return Ok(token.clone());
            }
            debug!(launch_id = %self.inner.launch.id, "Cached service token expired");
        }
        self.auth = AuthState::ServiceReady;

        let registration = &self.inner.registration;
        let claims = ClientAssertionClaims::new(&registration.client_id, &registration.auth_token_uri, now);
        let request = TokenRequest {
            token_endpoint: registration.auth_token_uri.clone(),
            client_assertion: self.key.sign(&claims)?,
            scopes: self.binding.scopes(),
        };

        let platform = Arc::clone(&self.inner.platform);
        let token = platform.request_token(&request).await.map_err(|e| {
            warn!(issuer = %registration.issuer, error = %e, "Service token request failed");
            ConnectorError::from(e)
        })?;

        debug!(launch_id = %self.inner.launch.id, expires_at = %token.expires_at, "Acquired service token");
        self.auth = AuthState::Authenticated(token.clone());
        Ok(token)
    }
}

/// Errors raised while building or using a connector
#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    #[error("Launch not found: {0}")]
    LaunchNotFound(String),

    #[error("No registration for issuer '{0}'")]
    RegistrationNotFound(String),

    #[error("No deployment '{deployment_id}' for issuer '{issuer}'")]
    DeploymentNotFound {
        issuer: String,
        deployment_id: String,
    },

    #[error("Invalid signing key: {0}")]
    InvalidKey(String),

    #[error("Service not available: {0}")]
    ServiceNotAvailable(String),

    #[error("Authentication with platform failed: {0}")]
    AuthFailure(String),

    #[error("Platform returned HTTP {status}")]
    Upstream { status: u16, body: String },

    #[error("Failed to parse platform response: {0}")]
    Parse(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Registration store error: {0}")]
    Repository(RepositoryError),

    #[error("Launch session error: {0}")]
    Session(String),
}

impl ConnectorError {
    /// Whether the same request might succeed if tried again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ConnectorError::AuthFailure(_)
                | ConnectorError::Upstream { .. }
                | ConnectorError::Parse(_)
                | ConnectorError::Network(_)
        )
    }

    /// Short error class for logs.
    pub fn class(&self) -> &'static str {
        match self {
            ConnectorError::LaunchNotFound(_)
            | ConnectorError::RegistrationNotFound(_)
            | ConnectorError::DeploymentNotFound { .. } => "not_found",
            ConnectorError::InvalidKey(_) => "configuration",
            ConnectorError::ServiceNotAvailable(_) => "service_not_available",
            ConnectorError::AuthFailure(_) => "auth_failure",
            ConnectorError::Upstream { .. } => "upstream",
            ConnectorError::Parse(_) => "parse",
            ConnectorError::Network(_) => "network",
            ConnectorError::Repository(_) | ConnectorError::Session(_) => "storage",
        }
    }
}

impl From<PlatformError> for ConnectorError {
    fn from(e: PlatformError) -> Self {
        match e {
            PlatformError::Authentication(msg) => ConnectorError::AuthFailure(msg),
            PlatformError::Upstream { status, body } => ConnectorError::Upstream { status, body },
            PlatformError::Parse(msg) => ConnectorError::Parse(msg),
            PlatformError::Network(msg) => ConnectorError::Network(msg),
        }
    }
}

impl From<KeyError> for ConnectorError {
    fn from(e: KeyError) -> Self {
        ConnectorError::InvalidKey(e.to_string())
    }
}

impl From<LaunchError> for ConnectorError {
    fn from(e: LaunchError) -> Self {
        ConnectorError::Session(e.to_string())
    }
}
