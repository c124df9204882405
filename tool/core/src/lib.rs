// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! LTI Tool Core
//!
//! Registration store, launch-scoped connectors and NRPS roster access for an
//! LTI 1.3 tool.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Turns a completed launch into an authorized roster fetch

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
