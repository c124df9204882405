// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Membership
//!
//! Read-only roster snapshot returned by a Names and Roles Provisioning
//! Service call. It has no identity beyond the response it came from.

use serde::{Deserialize, Serialize};

/// Course/context the roster belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipContext {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub user_id: String,
    /// Display name; falls back to given/family name or the user id.
    pub name: String,
    pub roles: Vec<String>,
    pub status: MemberStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MemberStatus {
    #[default]
    Active,
    Inactive,
    Deleted,
}

/// Context plus members, in the order the platform returned them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub context: MembershipContext,
    pub members: Vec<Member>,
}

impl Membership {
    pub fn member_names(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|m| m.name.as_str())
    }
}
