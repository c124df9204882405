// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Launch Sessions
//!
//! A [`LaunchSession`] associates one LTI launch with the registration and
//! deployment it came from, plus the subset of launch claims this tool acts
//! on. The launch validator (an external collaborator) verifies the id token
//! and hands the claim set over through
//! [`LaunchSessionProvider::record_validated_launch`]; connectors only read.
//!
//! ## Lifecycle
//!
//! ```text
//! LaunchSession::new(issuer, deployment_id, claims)   -> Pending
//!   └─ LaunchSession::complete()                      -> Completed
//!         └─ expires_at passes                        -> unusable
//! ```
//!
//! Only a `Completed`, unexpired session may back a connector. Anything else
//! is reported as a missing launch, never as a crash.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default lifetime of a launch session.
pub const DEFAULT_LAUNCH_TTL_MINUTES: i64 = 60;

/// Opaque launch identifier issued by the launch validator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LaunchId(pub String);

impl LaunchId {
    /// Generate a fresh random launch identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LaunchId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for LaunchId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for LaunchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LaunchStatus {
    /// Login accepted, launch message not yet validated.
    Pending,
    /// Launch message validated; services may be used.
    Completed,
}

/// `https://purl.imsglobal.org/spec/lti/claim/context`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextClaim {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// `https://purl.imsglobal.org/spec/lti-nrps/claim/namesroleservice`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamesRoleServiceClaim {
    pub context_memberships_url: String,
    #[serde(default)]
    pub service_versions: Vec<String>,
}

/// `https://purl.imsglobal.org/spec/lti-ags/claim/endpoint`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentGradeServiceClaim {
    #[serde(default)]
    pub scope: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lineitems: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lineitem: Option<String>,
}

/// Launch claims this tool reads, keyed by their LTI claim URIs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchClaims {
    #[serde(
        rename = "https://purl.imsglobal.org/spec/lti/claim/context",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub context: Option<ContextClaim>,

    #[serde(
        rename = "https://purl.imsglobal.org/spec/lti-nrps/claim/namesroleservice",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub names_role_service: Option<NamesRoleServiceClaim>,

    #[serde(
        rename = "https://purl.imsglobal.org/spec/lti-ags/claim/endpoint",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub assignment_grade_service: Option<AssignmentGradeServiceClaim>,
}

impl LaunchClaims {
    /// Extract the claims from a verified id-token claim set. Unknown claims are ignored.
    pub fn from_id_token_claims(claims: serde_json::Value) -> Result<Self, LaunchError> {
        serde_json::from_value(claims).map_err(|e| LaunchError::MalformedClaims(e.to_string()))
    }
}

/// One in-flight or completed launch.
#[derive(Debug, Clone)]
pub struct LaunchSession {
    pub id: LaunchId,
    pub issuer: String,
    pub deployment_id: String,
    pub claims: LaunchClaims,
    pub status: LaunchStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl LaunchSession {
    /// Start a pending session with the default lifetime.
    pub fn new(
        issuer: impl Into<String>,
        deployment_id: impl Into<String>,
        claims: LaunchClaims,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: LaunchId::new(),
            issuer: issuer.into(),
            deployment_id: deployment_id.into(),
            claims,
            status: LaunchStatus::Pending,
            created_at: now,
            expires_at: now + Duration::minutes(DEFAULT_LAUNCH_TTL_MINUTES),
        }
    }

    /// Mark the launch message as validated.
    pub fn complete(&mut self) {
        self.status = LaunchStatus::Completed;
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Completed and not yet expired.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.status == LaunchStatus::Completed && !self.is_expired(now)
    }
}

/// Launch session storage shared by the launch validator and connectors.
#[async_trait]
pub trait LaunchSessionProvider: Send + Sync {
    /// Look up a launch. `Ok(None)` means unknown or already evicted.
    async fn find_launch(&self, id: &LaunchId) -> Result<Option<LaunchSession>, LaunchError>;

    /// Record a launch whose id token has already been verified. The session
    /// is stored as completed and its id returned.
    async fn record_validated_launch(
        &self,
        issuer: &str,
        deployment_id: &str,
        id_token_claims: serde_json::Value,
    ) -> Result<LaunchId, LaunchError>;

    /// Drop sessions that expired before `now`. Returns how many were dropped.
    async fn evict_expired(&self, now: DateTime<Utc>) -> Result<usize, LaunchError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("Malformed launch claims: {0}")]
    MalformedClaims(String),

    #[error("Launch session storage error: {0}")]
    Storage(String),
}
