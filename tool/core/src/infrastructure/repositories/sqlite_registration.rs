// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # SQLite Registration Repository
//!
//! `RegistrationRepository` implementation backed by the `registration` and
//! `deployment` tables via `sqlx`.
//!
//! The schema is created on first use with `CREATE TABLE IF NOT EXISTS`, so
//! connecting to an already initialized database is harmless. Uniqueness is
//! enforced by the tables themselves; a violated constraint comes back from
//! SQLite and is mapped to `RepositoryError::DuplicateKey`.
//!
//! No in-process lock is held; concurrency is SQLite's business.

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use std::path::Path;
use tracing::{error, info};

use crate::domain::registration::{Deployment, Registration};
use crate::domain::repository::{RegistrationRepository, RepositoryError};
use crate::infrastructure::db::Database;

const SCHEMA: [&str; 2] = [
    r#"
    CREATE TABLE IF NOT EXISTS registration (
        issuer TEXT NOT NULL,
        client_id TEXT NOT NULL,
        auth_token_uri TEXT NOT NULL,
        auth_login_uri TEXT NOT NULL,
        keyset_uri TEXT NOT NULL,
        target_link_uri TEXT NOT NULL,
        UNIQUE (issuer)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS deployment (
        issuer TEXT NOT NULL,
        deployment_id TEXT NOT NULL,
        UNIQUE (issuer, deployment_id)
    )
    "#,
];

#[derive(Clone)]
pub struct SqliteRegistrationRepository {
    pool: SqlitePool,
}

impl SqliteRegistrationRepository {
    /// Open the database at `path` and make sure the schema exists.
    pub async fn connect(path: &Path) -> Result<Self, RepositoryError> {
        let db = Database::open(path).await?;
        info!(path = %path.display(), "Opened SQLite registration database");

        let repo = Self::new(db.get_pool().clone());
        repo.ensure_schema().await?;
        Ok(repo)
    }

    /// Wrap an existing pool. Call [`Self::ensure_schema`] before use.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create both tables if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), RepositoryError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    error!(error = %e, "Failed to create table");
                    RepositoryError::Database(format!("cannot create table: {}", e))
                })?;
        }
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn registration_from_row(row: &SqliteRow) -> Result<Registration, RepositoryError> {
    let issuer: String = row.try_get("issuer")?;
    let client_id: String = row.try_get("client_id")?;
    let auth_token_uri: String = row.try_get("auth_token_uri")?;
    let auth_login_uri: String = row.try_get("auth_login_uri")?;
    let keyset_uri: String = row.try_get("keyset_uri")?;
    let target_link_uri: String = row.try_get("target_link_uri")?;

    Ok(Registration::try_new(
        issuer,
        client_id,
        &auth_token_uri,
        &auth_login_uri,
        &keyset_uri,
        &target_link_uri,
    )?)
}

/// Zero rows is `NotFound`; more than one is a schema bug.
fn exactly_one(rows: Vec<SqliteRow>, what: String) -> Result<SqliteRow, RepositoryError> {
    let count = rows.len();
    let mut rows = rows.into_iter();
    match (rows.next(), count) {
        (None, _) => Err(RepositoryError::NotFound(what)),
        (Some(row), 1) => Ok(row),
        (Some(_), n) => {
            error!(record = %what, rows = n, "Uniqueness invariant violated");
            Err(RepositoryError::InvariantViolation(format!(
                "{} matched {} rows",
                what, n
            )))
        }
    }
}

#[async_trait]
impl RegistrationRepository for SqliteRegistrationRepository {
    async fn store_registration(&self, registration: &Registration) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO registration (
                issuer, client_id, auth_token_uri, auth_login_uri, keyset_uri, target_link_uri
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&registration.issuer)
        .bind(&registration.client_id)
        .bind(registration.auth_token_uri.as_str())
        .bind(registration.auth_login_uri.as_str())
        .bind(registration.keyset_uri.as_str())
        .bind(registration.target_link_uri.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| match RepositoryError::from(e) {
            RepositoryError::DuplicateKey(_) => RepositoryError::DuplicateKey(format!(
                "registration for issuer '{}'",
                registration.issuer
            )),
            other => {
                error!(issuer = %registration.issuer, error = %other, "Failed to store registration");
                other
            }
        })?;

        info!(issuer = %registration.issuer, "Stored registration in database");
        Ok(())
    }

    async fn find_registration(&self, issuer: &str) -> Result<Registration, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT issuer, client_id, auth_token_uri, auth_login_uri, keyset_uri, target_link_uri
            FROM registration
            WHERE issuer = $1
            "#,
        )
        .bind(issuer)
        .fetch_all(&self.pool)
        .await?;

        let row = exactly_one(rows, format!("registration for issuer '{}'", issuer))?;
        registration_from_row(&row)
    }

    async fn store_deployment(&self, deployment: &Deployment) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO deployment (issuer, deployment_id)
            VALUES ($1, $2)
            "#,
        )
        .bind(&deployment.issuer)
        .bind(&deployment.deployment_id)
        .execute(&self.pool)
        .await
        .map_err(|e| match RepositoryError::from(e) {
            RepositoryError::DuplicateKey(_) => RepositoryError::DuplicateKey(format!(
                "deployment '{}' for issuer '{}'",
                deployment.deployment_id, deployment.issuer
            )),
            other => {
                error!(
                    issuer = %deployment.issuer,
                    deployment_id = %deployment.deployment_id,
                    error = %other,
                    "Failed to store deployment"
                );
                other
            }
        })?;

        info!(
            issuer = %deployment.issuer,
            deployment_id = %deployment.deployment_id,
            "Stored deployment in database"
        );
        Ok(())
    }

    async fn find_deployment(
        &self,
        issuer: &str,
        deployment_id: &str,
    ) -> Result<Deployment, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT issuer, deployment_id
            FROM deployment
            WHERE issuer = $1 AND deployment_id = $2
            "#,
        )
        .bind(issuer)
        .bind(deployment_id)
        .fetch_all(&self.pool)
        .await?;

        let row = exactly_one(
            rows,
            format!("deployment '{}' for issuer '{}'", deployment_id, issuer),
        )?;

        Ok(Deployment::try_new(
            row.try_get::<String, _>("issuer")?,
            row.try_get::<String, _>("deployment_id")?,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn registration(client_id: &str) -> Registration {
        Registration::try_new(
            "https://platform.example",
            client_id,
            "https://platform.example/token",
            "https://platform.example/login",
            "https://platform.example/jwks",
            "https://tool.example/launch",
        )
        .unwrap()
    }

    async fn repo(dir: &TempDir) -> SqliteRegistrationRepository {
        SqliteRegistrationRepository::connect(&dir.path().join("lti.db"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_registration_round_trip() {
        let dir = TempDir::new().unwrap();
        let repo = repo(&dir).await;
        let reg = registration("abc");

        repo.store_registration(&reg).await.unwrap();

        assert_eq!(repo.find_registration(&reg.issuer).await.unwrap(), reg);
    }

    #[tokio::test]
    async fn test_duplicate_issuer_is_duplicate_key() {
        let dir = TempDir::new().unwrap();
        let repo = repo(&dir).await;
        repo.store_registration(&registration("abc")).await.unwrap();

        let err = repo.store_registration(&registration("other")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::DuplicateKey(_)), "got {:?}", err);

        let stored = repo.find_registration("https://platform.example").await.unwrap();
        assert_eq!(stored.client_id, "abc");
    }

    #[tokio::test]
    async fn test_deployment_round_trip_and_duplicate() {
        let dir = TempDir::new().unwrap();
        let repo = repo(&dir).await;
        let dep = Deployment::try_new("https://platform.example", "dep-1").unwrap();

        repo.store_deployment(&dep).await.unwrap();
        assert_eq!(
            repo.find_deployment("https://platform.example", "dep-1").await.unwrap(),
            dep
        );

        let err = repo.store_deployment(&dep).await.unwrap_err();
        assert!(matches!(err, RepositoryError::DuplicateKey(_)));

        assert!(matches!(
            repo.find_deployment("https://platform.example", "dep-2").await,
            Err(RepositoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_schema_creation_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lti.db");
        let first = SqliteRegistrationRepository::connect(&path).await.unwrap();
        first.store_registration(&registration("abc")).await.unwrap();
        first.pool().close().await;

        let second = SqliteRegistrationRepository::connect(&path).await.unwrap();
        assert!(second.find_registration("https://platform.example").await.is_ok());
    }

    #[tokio::test]
    async fn test_multiple_rows_fail_loudly() {
        let dir = TempDir::new().unwrap();
        let db = Database::open(&dir.path().join("broken.db")).await.unwrap();
        // A table created without the uniqueness constraint.
        sqlx::query("CREATE TABLE deployment (issuer TEXT, deployment_id TEXT)")
            .execute(db.get_pool())
            .await
            .unwrap();
        let repo = SqliteRegistrationRepository::new(db.get_pool().clone());
        repo.ensure_schema().await.unwrap();

        for _ in 0..2 {
            sqlx::query("INSERT INTO deployment (issuer, deployment_id) VALUES ('https://platform.example', 'dep-1')")
                .execute(repo.pool())
                .await
                .unwrap();
        }

        let err = repo
            .find_deployment("https://platform.example", "dep-1")
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::InvariantViolation(_)));
    }
}
