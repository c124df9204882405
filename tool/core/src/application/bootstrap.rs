// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Store Bootstrapper
//!
//! Runs once at process start: picks the backend, creates its schema and
//! seeds it with one registration and one deployment. The returned handle is
//! the only store the process uses; there is no process-wide default.
//!
//! A SQLite store is only ever bootstrapped into a fresh file. If the path
//! already exists the bootstrapper fails with [`BootstrapError::AlreadyExists`]
//! before touching it.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use crate::application::repository_factory::create_registration_repository;
use crate::domain::repository::{RegistrationRepository, RepositoryError, StorageBackend};
use crate::domain::seed_config::SeedConfig;

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("Refusing to initialize store: {} already exists", .0.display())]
    AlreadyExists(PathBuf),

    #[error("Failed to seed store: {0}")]
    Repository(#[from] RepositoryError),
}

/// Create the configured store and seed it.
pub async fn bootstrap(
    backend: &StorageBackend,
    seed: &SeedConfig,
) -> Result<Arc<dyn RegistrationRepository>, BootstrapError> {
    if let StorageBackend::Sqlite(config) = backend {
        if config.path.exists() {
            error!(path = %config.path.display(), "Database already exists");
            return Err(BootstrapError::AlreadyExists(config.path.clone()));
        }
    }

    let store = create_registration_repository(backend).await?;
    seed_store(store.as_ref(), seed).await?;

    info!(
        backend = backend_name(backend),
        issuer = %seed.registration.issuer,
        deployment_id = %seed.deployment.deployment_id,
        "Registration store bootstrapped"
    );
    Ok(store)
}

/// Store the seed registration and deployment.
pub async fn seed_store(
    store: &dyn RegistrationRepository,
    seed: &SeedConfig,
) -> Result<(), RepositoryError> {
    store.store_registration(&seed.registration).await?;
    store.store_deployment(&seed.deployment).await?;
    Ok(())
}

fn backend_name(backend: &StorageBackend) -> &'static str {
    match backend {
        StorageBackend::InMemory => "in-memory",
        StorageBackend::Sqlite(_) => "sqlite",
    }
}
