// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Platform service adapters
//
// Implementations of the domain `PlatformClient` interface.

pub mod http;

pub use http::HttpPlatformClient;
