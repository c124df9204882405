// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Trust Records
//!
//! A [`Registration`] identifies a trusted platform: its OAuth/OIDC endpoints
//! and the client identity this tool holds with it. A [`Deployment`] scopes a
//! registration to one tenant installation on that platform.
//!
//! ## Invariants
//!
//! - `issuer` is the unique key of a registration within a store.
//! - Every URI field is a well-formed absolute URI; the `Url` type enforces it.
//! - `(issuer, deployment_id)` is the unique key of a deployment.
//! - Records are never mutated after creation.

use serde::{Deserialize, Serialize};
use url::Url;

/// Trust record for one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub issuer: String,
    pub client_id: String,
    pub auth_token_uri: Url,
    pub auth_login_uri: Url,
    pub keyset_uri: Url,
    pub target_link_uri: Url,
}

impl Registration {
    /// Build a registration from raw strings, validating every field.
    pub fn try_new(
        issuer: impl Into<String>,
        client_id: impl Into<String>,
        auth_token_uri: &str,
        auth_login_uri: &str,
        keyset_uri: &str,
        target_link_uri: &str,
    ) -> Result<Self, RecordError> {
        let issuer = non_empty("issuer", issuer.into())?;
        let client_id = non_empty("client_id", client_id.into())?;

        Ok(Self {
            issuer,
            client_id,
            auth_token_uri: absolute_uri("auth_token_uri", auth_token_uri)?,
            auth_login_uri: absolute_uri("auth_login_uri", auth_login_uri)?,
            keyset_uri: absolute_uri("keyset_uri", keyset_uri)?,
            target_link_uri: absolute_uri("target_link_uri", target_link_uri)?,
        })
    }
}

/// Tenant deployment within a platform registration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Deployment {
    pub issuer: String,
    pub deployment_id: String,
}

impl Deployment {
    pub fn try_new(
        issuer: impl Into<String>,
        deployment_id: impl Into<String>,
    ) -> Result<Self, RecordError> {
        Ok(Self {
            issuer: non_empty("issuer", issuer.into())?,
            deployment_id: non_empty("deployment_id", deployment_id.into())?,
        })
    }
}

/// Validation failures for trust records.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("Field '{0}' must not be empty")]
    EmptyField(&'static str),

    #[error("Field '{field}' is not an absolute URI ({value}): {reason}")]
    InvalidUri {
        field: &'static str,
        value: String,
        reason: String,
    },
}

fn non_empty(field: &'static str, value: String) -> Result<String, RecordError> {
    if value.trim().is_empty() {
        return Err(RecordError::EmptyField(field));
    }
    Ok(value)
}

pub(crate) fn absolute_uri(field: &'static str, value: &str) -> Result<Url, RecordError> {
    let url = Url::parse(value).map_err(|e| RecordError::InvalidUri {
        field,
        value: value.to_string(),
        reason: e.to_string(),
    })?;

    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(RecordError::InvalidUri {
            field,
            value: value.to_string(),
            reason: "missing authority".to_string(),
        });
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_accepts_absolute_uris() {
        let reg = Registration::try_new(
            "https://platform.example",
            "abc",
            "https://platform.example/token",
            "https://platform.example/login",
            "https://platform.example/jwks",
            "https://tool.example/launch",
        )
        .unwrap();

        assert_eq!(reg.issuer, "https://platform.example");
        assert_eq!(reg.auth_token_uri.path(), "/token");
    }

    #[test]
    fn test_registration_rejects_relative_uri() {
        let err = Registration::try_new(
            "https://platform.example",
            "abc",
            "/token",
            "https://platform.example/login",
            "https://platform.example/jwks",
            "https://tool.example/launch",
        )
        .unwrap_err();

        assert!(matches!(err, RecordError::InvalidUri { field: "auth_token_uri", .. }));
    }

    #[test]
    fn test_registration_rejects_opaque_uri() {
        let err = Registration::try_new(
            "https://platform.example",
            "abc",
            "https://platform.example/token",
            "mailto:admin@platform.example",
            "https://platform.example/jwks",
            "https://tool.example/launch",
        )
        .unwrap_err();

        assert!(matches!(err, RecordError::InvalidUri { field: "auth_login_uri", .. }));
    }

    #[test]
    fn test_deployment_requires_identifier() {
        assert_eq!(
            Deployment::try_new("https://platform.example", "  ").unwrap_err(),
            RecordError::EmptyField("deployment_id")
        );
    }
}
