// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Presentation Layer (`lti-tool-core`)
//!
//! HTTP surface of the tool. Handlers delegate to
//! `crate::application::RosterService` and only render or translate errors.
//!
//! | Route | Method | Description |
//! |-------|--------|-------------|
//! | `/launch` | GET, POST | Launch completion: roster page or opaque 500 |
//! | `/keyset` | GET | Tool public keys as JWKS |
//! | `/health` | GET | Liveness probe |

pub mod api;
pub mod render;

pub use api::{app, AppState};
pub use render::RosterRenderer;
