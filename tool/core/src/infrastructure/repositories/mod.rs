// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! Infrastructure implementations of the `RegistrationRepository` contract
//! defined in the domain layer.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Persist and retrieve registrations and deployments
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)
//!
//! # Available Implementations
//!
//! - **InMemoryRegistrationRepository** - HashMaps behind one lock, no durability
//! - **SqliteRegistrationRepository** - `registration` / `deployment` tables via `sqlx`
//!
//! Both reject duplicates with `RepositoryError::DuplicateKey`.

pub mod sqlite_registration;

pub use sqlite_registration::SqliteRegistrationRepository;

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::domain::registration::{Deployment, Registration};
use crate::domain::repository::{RegistrationRepository, RepositoryError};

#[derive(Default)]
struct Records {
    registrations: HashMap<String, Registration>,
    deployments: HashMap<(String, String), Deployment>,
}

/// In-memory trust-record store.
///
/// Every operation takes the same lock; record counts are small and each
/// operation is a single map access.
#[derive(Clone, Default)]
pub struct InMemoryRegistrationRepository {
    records: Arc<Mutex<Records>>,
}

impl InMemoryRegistrationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RegistrationRepository for InMemoryRegistrationRepository {
    async fn store_registration(&self, registration: &Registration) -> Result<(), RepositoryError> {
        let mut records = self.records.lock();
        if records.registrations.contains_key(&registration.issuer) {
            return Err(RepositoryError::DuplicateKey(format!(
                "registration for issuer '{}'",
                registration.issuer
            )));
        }
        records
            .registrations
            .insert(registration.issuer.clone(), registration.clone());
        info!(issuer = %registration.issuer, "Stored registration");
        Ok(())
    }

    async fn find_registration(&self, issuer: &str) -> Result<Registration, RepositoryError> {
        let records = self.records.lock();
        records
            .registrations
            .get(issuer)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("registration for issuer '{}'", issuer)))
    }

    async fn store_deployment(&self, deployment: &Deployment) -> Result<(), RepositoryError> {
        let key = (deployment.issuer.clone(), deployment.deployment_id.clone());
        let mut records = self.records.lock();
        if records.deployments.contains_key(&key) {
            return Err(RepositoryError::DuplicateKey(format!(
                "deployment '{}' for issuer '{}'",
                deployment.deployment_id, deployment.issuer
            )));
        }
        records.deployments.insert(key, deployment.clone());
        info!(
            issuer = %deployment.issuer,
            deployment_id = %deployment.deployment_id,
            "Stored deployment"
        );
        Ok(())
    }

    async fn find_deployment(
        &self,
        issuer: &str,
        deployment_id: &str,
    ) -> Result<Deployment, RepositoryError> {
        let records = self.records.lock();
        records
            .deployments
            .get(&(issuer.to_string(), deployment_id.to_string()))
            .cloned()
            .ok_or_else(|| {
                RepositoryError::NotFound(format!(
                    "deployment '{}' for issuer '{}'",
                    deployment_id, issuer
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(issuer: &str, client_id: &str) -> Registration {
        Registration::try_new(
            issuer,
            client_id,
            "https://platform.example/token",
            "https://platform.example/login",
            "https://platform.example/jwks",
            "https://tool.example/launch",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_registration_round_trip() {
        let repo = InMemoryRegistrationRepository::new();
        let reg = registration("https://platform.example", "abc");

        repo.store_registration(&reg).await.unwrap();

        assert_eq!(repo.find_registration(&reg.issuer).await.unwrap(), reg);
    }

    #[tokio::test]
    async fn test_duplicate_issuer_rejected_and_original_kept() {
        let repo = InMemoryRegistrationRepository::new();
        repo.store_registration(&registration("https://platform.example", "abc"))
            .await
            .unwrap();

        let err = repo
            .store_registration(&registration("https://platform.example", "other"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::DuplicateKey(_)));

        let stored = repo.find_registration("https://platform.example").await.unwrap();
        assert_eq!(stored.client_id, "abc");
    }

    #[tokio::test]
    async fn test_missing_records_are_not_found() {
        let repo = InMemoryRegistrationRepository::new();
        assert!(matches!(
            repo.find_registration("https://nowhere.example").await,
            Err(RepositoryError::NotFound(_))
        ));
        assert!(matches!(
            repo.find_deployment("https://nowhere.example", "dep-1").await,
            Err(RepositoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_deployment_round_trip_and_duplicate() {
        let repo = InMemoryRegistrationRepository::new();
        let dep = Deployment::try_new("https://platform.example", "dep-1").unwrap();

        repo.store_deployment(&dep).await.unwrap();
        assert_eq!(
            repo.find_deployment("https://platform.example", "dep-1").await.unwrap(),
            dep
        );
        assert!(matches!(
            repo.store_deployment(&dep).await,
            Err(RepositoryError::DuplicateKey(_))
        ));

        // Same deployment id under another issuer is a different record.
        let other = Deployment::try_new("https://other.example", "dep-1").unwrap();
        repo.store_deployment(&other).await.unwrap();
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let repo = InMemoryRegistrationRepository::new();
        let handle = repo.clone();
        repo.store_registration(&registration("https://platform.example", "abc"))
            .await
            .unwrap();
        assert!(handle.find_registration("https://platform.example").await.is_ok());
    }
}
