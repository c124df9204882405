// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interface
//!
//! Persistence contract for the trust records ([`Registration`] and
//! [`Deployment`]). The interface lives in the domain layer; concrete
//! implementations live in `crate::infrastructure::repositories`.
//!
//! | Trait | Records | Implementations |
//! |-------|---------|----------------|
//! | `RegistrationRepository` | `Registration`, `Deployment` | `InMemoryRegistrationRepository`, `SqliteRegistrationRepository` |
//!
//! ## Duplicate Policy
//!
//! Both implementations reject a second registration for an existing issuer,
//! and a second deployment for an existing `(issuer, deployment_id)` pair,
//! with [`RepositoryError::DuplicateKey`]. Nothing is overwritten.
//!
//! ## Lookup Semantics
//!
//! Lookups return exactly one record or [`RepositoryError::NotFound`]. A
//! backend that finds more than one matching row reports
//! [`RepositoryError::InvariantViolation`] instead of picking one.

use async_trait::async_trait;
use std::path::PathBuf;

use crate::domain::registration::{Deployment, Registration};

/// Storage backend selection for the trust-record store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    InMemory,
    Sqlite(SqliteConfig),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteConfig {
    /// Database file; must not exist when bootstrapping
    pub path: PathBuf,
}

/// Repository interface for platform registrations and their deployments.
///
/// Implementations must be safe to share across request tasks.
#[async_trait]
pub trait RegistrationRepository: Send + Sync {
    /// Store a new registration. Fails with `DuplicateKey` if the issuer is taken.
    async fn store_registration(&self, registration: &Registration) -> Result<(), RepositoryError>;

    /// Fetch the registration for an issuer.
    async fn find_registration(&self, issuer: &str) -> Result<Registration, RepositoryError>;

    /// Store a new deployment. Fails with `DuplicateKey` if the pair exists.
    async fn store_deployment(&self, deployment: &Deployment) -> Result<(), RepositoryError>;

    /// Fetch a deployment by issuer and deployment identifier.
    async fn find_deployment(
        &self,
        issuer: &str,
        deployment_id: &str,
    ) -> Result<Deployment, RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Storage already exists: {0}")]
    AlreadyExists(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("Row not found".to_string()),
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                RepositoryError::DuplicateKey(db_err.message().to_string())
            }
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}

impl From<crate::domain::registration::RecordError> for RepositoryError {
    fn from(err: crate::domain::registration::RecordError) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
