// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod bootstrap;
pub mod connector;
pub mod repository_factory;
pub mod roster_service;

pub use bootstrap::{bootstrap, BootstrapError};
pub use connector::{
    AuthState, Connector, ConnectorError, ConnectorFactory, ConnectorState, KeyedConnector,
    ServiceCapability, ServiceConnector,
};
pub use roster_service::{RosterService, RosterView};
