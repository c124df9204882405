// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod db;
pub mod launch_sessions;
pub mod platform;
pub mod repositories;

pub use launch_sessions::InMemoryLaunchSessionStore;
pub use platform::HttpPlatformClient;
pub use repositories::{InMemoryRegistrationRepository, SqliteRegistrationRepository};
