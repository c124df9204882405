// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Seed Configuration
//
// Trust records and the signing key are supplied by the operator through
// environment variables:
//
// - REG_ISSUER, REG_CLIENTID, REG_AUTHTOKENURI, REG_AUTHLOGINURI,
//   REG_KEYSETURI, REG_TARGETLINKURI
// - DEP_DEPLOYMENTID
// - KEY_PRIVATE
//
// Any missing or malformed value is a configuration error and is fatal at
// startup.

use crate::domain::key::{KeyError, SigningKey};
use crate::domain::registration::{Deployment, RecordError, Registration};

pub const REG_ISSUER: &str = "REG_ISSUER";
pub const REG_CLIENT_ID: &str = "REG_CLIENTID";
pub const REG_AUTH_TOKEN_URI: &str = "REG_AUTHTOKENURI";
pub const REG_AUTH_LOGIN_URI: &str = "REG_AUTHLOGINURI";
pub const REG_KEYSET_URI: &str = "REG_KEYSETURI";
pub const REG_TARGET_LINK_URI: &str = "REG_TARGETLINKURI";
pub const DEP_DEPLOYMENT_ID: &str = "DEP_DEPLOYMENTID";
pub const KEY_PRIVATE: &str = "KEY_PRIVATE";

/// One registration and one deployment used to seed a fresh store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedConfig {
    pub registration: Registration,
    pub deployment: Deployment,
}

impl SeedConfig {
    pub fn new(registration: Registration, deployment: Deployment) -> Result<Self, ConfigError> {
        if deployment.issuer != registration.issuer {
            return Err(ConfigError::IssuerMismatch {
                registration: registration.issuer,
                deployment: deployment.issuer,
            });
        }
        Ok(Self {
            registration,
            deployment,
        })
    }

    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &'static str| required(&lookup, name);

        let issuer = var(REG_ISSUER)?;
        let registration = Registration::try_new(
            issuer.clone(),
            var(REG_CLIENT_ID)?,
            &var(REG_AUTH_TOKEN_URI)?,
            &var(REG_AUTH_LOGIN_URI)?,
            &var(REG_KEYSET_URI)?,
            &var(REG_TARGET_LINK_URI)?,
        )?;
        let deployment = Deployment::try_new(issuer, var(DEP_DEPLOYMENT_ID)?)?;

        Self::new(registration, deployment)
    }
}

/// Load the tool's signing key from `KEY_PRIVATE`.
pub fn signing_key_from_env(kid: &str) -> Result<SigningKey, ConfigError> {
    signing_key_from_lookup(kid, |name| std::env::var(name).ok())
}

pub fn signing_key_from_lookup<F>(kid: &str, lookup: F) -> Result<SigningKey, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let pem = required(&lookup, KEY_PRIVATE)?;
    // Environment files often carry the PEM on one line with escaped newlines.
    let pem = pem.replace("\\n", "\n");
    Ok(SigningKey::from_pem(kid, &pem)?)
}

fn required<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(ConfigError::Missing(name)),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid trust record: {0}")]
    InvalidRecord(#[from] RecordError),

    #[error("Invalid signing key: {0}")]
    InvalidKey(#[from] KeyError),

    #[error("Deployment issuer '{deployment}' does not match registration issuer '{registration}'")]
    IssuerMismatch {
        registration: String,
        deployment: String,
    },
}
