// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # LTI Tool
//!
//! The `lti-tool` binary serves the tool side of an LTI 1.3 launch: it
//! bootstraps the registration store, then answers completed launches with
//! the course roster fetched over NRPS.
//!
//! ## Configuration
//!
//! Flags fall back to `LTI_*` environment variables. The seed registration,
//! deployment and signing key come from `REG_*`, `DEP_DEPLOYMENTID` and
//! `KEY_PRIVATE`. A `.env` file in the working directory is loaded first.

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{info, warn};

use lti_tool::config::{Datastore, ServeConfig};
use lti_tool::server;
use lti_tool_core::domain::key::DEFAULT_KEY_ID;

/// LTI 1.3 tool endpoint with launch-scoped roster access
#[derive(Parser)]
#[command(name = "lti-tool")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "LTI_ADDR", default_value = "0.0.0.0:8080")]
    addr: SocketAddr,

    /// Registration store backend
    #[arg(long, env = "LTI_DATASTORE", value_enum, default_value_t = Datastore::InMemory)]
    datastore: Datastore,

    /// SQLite database file; must not exist yet
    #[arg(long, env = "LTI_DATABASE", value_name = "FILE", default_value = "test.db")]
    database: PathBuf,

    /// Key identifier published in the keyset and used in client assertions
    #[arg(long, env = "LTI_KEY_ID", default_value = DEFAULT_KEY_ID)]
    key_id: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LTI_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    match dotenv {
        Ok(path) => info!(path = %path.display(), "Loaded environment file"),
        Err(e) if e.not_found() => {}
        Err(e) => warn!(error = %e, "Failed to load .env file"),
    }

    let config = ServeConfig {
        addr: cli.addr,
        datastore: cli.datastore,
        database: cli.database,
        key_id: cli.key_id,
    };
    info!(datastore = ?config.datastore, "Starting LTI tool");

    server::run(config).await
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}
