// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// In-memory launch session store
//
// Reference `LaunchSessionProvider` for single-process deployments. The launch
// validator either records a verified claim set in one step, or inserts a
// pending session at login and completes it once the launch message checks
// out. Connectors only read.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::launch::{
    LaunchClaims, LaunchError, LaunchId, LaunchSession, LaunchSessionProvider,
};

#[derive(Clone, Default)]
pub struct InMemoryLaunchSessionStore {
    sessions: Arc<RwLock<HashMap<LaunchId, LaunchSession>>>,
}

impl InMemoryLaunchSessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a session, replacing any earlier one with the same id.
    pub fn insert(&self, session: LaunchSession) -> LaunchId {
        let id = session.id.clone();
        debug!(launch_id = %id, issuer = %session.issuer, "Tracking launch session");
        self.sessions.write().insert(id.clone(), session);
        id
    }

    /// Mark a tracked session as validated. Returns false if it is unknown.
    pub fn complete_launch(&self, id: &LaunchId) -> bool {
        match self.sessions.write().get_mut(id) {
            Some(session) => {
                session.complete();
                info!(launch_id = %id, "Launch completed");
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

#[async_trait]
impl LaunchSessionProvider for InMemoryLaunchSessionStore {
    async fn find_launch(&self, id: &LaunchId) -> Result<Option<LaunchSession>, LaunchError> {
        Ok(self.sessions.read().get(id).cloned())
    }

    async fn record_validated_launch(
        &self,
        issuer: &str,
        deployment_id: &str,
        id_token_claims: serde_json::Value,
    ) -> Result<LaunchId, LaunchError> {
        let claims = LaunchClaims::from_id_token_claims(id_token_claims)?;
        let mut session = LaunchSession::new(issuer, deployment_id, claims);
        session.complete();

        let id = self.insert(session);
        info!(launch_id = %id, issuer, deployment_id, "Recorded validated launch");
        Ok(id)
    }

    async fn evict_expired(&self, now: DateTime<Utc>) -> Result<usize, LaunchError> {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(now));
        Ok(before - sessions.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::launch::LaunchStatus;
    use chrono::Duration;
    use serde_json::json;

    fn session() -> LaunchSession {
        LaunchSession::new("https://platform.example", "dep-1", LaunchClaims::default())
    }

    #[tokio::test]
    async fn test_insert_complete_and_find() {
        let store = InMemoryLaunchSessionStore::new();
        let id = store.insert(session());

        let found = store.find_launch(&id).await.unwrap().unwrap();
        assert_eq!(found.status, LaunchStatus::Pending);

        assert!(store.complete_launch(&id));
        let found = store.find_launch(&id).await.unwrap().unwrap();
        assert_eq!(found.status, LaunchStatus::Completed);
    }

    #[tokio::test]
    async fn test_unknown_launch_is_none() {
        let store = InMemoryLaunchSessionStore::new();
        assert!(store.find_launch(&LaunchId::from("missing")).await.unwrap().is_none());
        assert!(!store.complete_launch(&LaunchId::from("missing")));
    }

    #[tokio::test]
    async fn test_evict_expired() {
        let store = InMemoryLaunchSessionStore::new();
        let mut stale = session();
        stale.expires_at = Utc::now() - Duration::minutes(1);
        store.insert(stale);
        store.insert(session());

        assert_eq!(store.evict_expired(Utc::now()).await.unwrap(), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.evict_expired(Utc::now()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_record_validated_launch_is_usable() {
        let store = InMemoryLaunchSessionStore::new();
        let id = store
            .record_validated_launch(
                "https://platform.example",
                "dep-1",
                json!({
                    "sub": "u-alice",
                    "https://purl.imsglobal.org/spec/lti/claim/context": {"id": "ctx-1"}
                }),
            )
            .await
            .unwrap();

        let found = store.find_launch(&id).await.unwrap().unwrap();
        assert!(found.is_usable(Utc::now()));
        assert_eq!(found.deployment_id, "dep-1");
        assert_eq!(found.claims.context.unwrap().id, "ctx-1");
    }

    #[tokio::test]
    async fn test_record_validated_launch_rejects_malformed_claims() {
        let store = InMemoryLaunchSessionStore::new();
        let err = store
            .record_validated_launch(
                "https://platform.example",
                "dep-1",
                json!({"https://purl.imsglobal.org/spec/lti/claim/context": 42}),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, LaunchError::MalformedClaims(_)));
        assert!(store.is_empty());
    }
}
