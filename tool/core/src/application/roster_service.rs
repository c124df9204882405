// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Roster Service
//
// Post-launch use case: build a connector for the launch, key it, upgrade it
// to names-and-roles and fetch the roster.

use serde::Serialize;
use tracing::info;

use crate::application::connector::{ConnectorError, ConnectorFactory};
use crate::domain::key::SigningKey;
use crate::domain::launch::LaunchId;
use crate::domain::membership::Membership;

/// Roster fetched on behalf of one launch.
#[derive(Debug, Clone, Serialize)]
pub struct RosterView {
    pub launch_id: LaunchId,
    pub membership: Membership,
}

#[derive(Clone)]
pub struct RosterService {
    factory: ConnectorFactory,
    signing_key: SigningKey,
}

impl RosterService {
    pub fn new(factory: ConnectorFactory, signing_key: SigningKey) -> Self {
        Self {
            factory,
            signing_key,
        }
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    pub async fn roster_for_launch(&self, launch_id: &LaunchId) -> Result<RosterView, ConnectorError> {
        let connector = self
            .factory
            .connect(launch_id, Some(self.signing_key.kid()))
            .await?;

        let mut service = connector
            .with_signing_key(self.signing_key.clone())?
            .upgrade_nrps()?;

        let membership = service.get_membership().await?;
        info!(
            launch_id = %launch_id,
            course = %membership.context.title,
            members = membership.members.len(),
            "Roster ready"
        );

        Ok(RosterView {
            launch_id: launch_id.clone(),
            membership,
        })
    }
}
