// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Repository Factory - Application Layer
//!
//! Creates the concrete trust-record store for the configured
//! [`StorageBackend`]. The domain layer only knows the
//! `RegistrationRepository` trait; this is where a backend gets picked.

use std::sync::Arc;

use crate::domain::repository::{RegistrationRepository, RepositoryError, StorageBackend};
use crate::infrastructure::repositories::{
    InMemoryRegistrationRepository, SqliteRegistrationRepository,
};

/// Creates a RegistrationRepository implementation based on the configured backend
pub async fn create_registration_repository(
    backend: &StorageBackend,
) -> Result<Arc<dyn RegistrationRepository>, RepositoryError> {
    match backend {
        StorageBackend::InMemory => Ok(Arc::new(InMemoryRegistrationRepository::new())),
        StorageBackend::Sqlite(config) => Ok(Arc::new(
            SqliteRegistrationRepository::connect(&config.path).await?,
        )),
    }
}
