// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Trust records, launch sessions, keys and the platform-facing contracts.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Pure types and traits; no I/O lives here

pub mod registration;
pub mod repository;
pub mod launch;
pub mod key;
pub mod membership;
pub mod platform;
pub mod seed_config;
