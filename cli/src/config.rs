// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Server configuration resolved from command-line flags and environment.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::ValueEnum;
use lti_tool_core::domain::repository::{SqliteConfig, StorageBackend};

/// Registration store backend selectable on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Datastore {
    /// Process memory only; nothing survives a restart
    #[default]
    InMemory,
    /// SQLite database file, created on startup
    Sqlite,
}

#[derive(Debug, Clone)]
pub struct ServeConfig {
    pub addr: SocketAddr,
    pub datastore: Datastore,
    pub database: PathBuf,
    pub key_id: String,
}

impl ServeConfig {
    pub fn storage_backend(&self) -> StorageBackend {
        match self.datastore {
            Datastore::InMemory => StorageBackend::InMemory,
            Datastore::Sqlite => StorageBackend::Sqlite(SqliteConfig {
                path: self.database.clone(),
            }),
        }
    }
}
