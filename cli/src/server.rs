// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Tool HTTP server: wires the store, launch sessions, platform client and
//! roster service together and serves the router until shutdown.

use anyhow::{Context, Result};
use axum::Router;
use chrono::Utc;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{debug, error, info};

use lti_tool_core::application::{bootstrap, ConnectorFactory, RosterService};
use lti_tool_core::domain::key::SigningKey;
use lti_tool_core::domain::launch::LaunchSessionProvider;
use lti_tool_core::domain::seed_config::{signing_key_from_env, SeedConfig};
use lti_tool_core::infrastructure::{HttpPlatformClient, InMemoryLaunchSessionStore};
use lti_tool_core::presentation::{app, RosterRenderer};

use crate::config::ServeConfig;

const SESSION_EVICTION_INTERVAL: Duration = Duration::from_secs(60);

/// Bootstrap the store and build the router.
///
/// `sessions` is where the launch validator records verified launches; the
/// router resolves `launch_id` against it.
pub async fn build_app(
    config: &ServeConfig,
    seed: &SeedConfig,
    signing_key: SigningKey,
    sessions: Arc<dyn LaunchSessionProvider>,
) -> Result<Router> {
    let store = bootstrap(&config.storage_backend(), seed)
        .await
        .context("Failed to bootstrap registration store")?;

    let platform =
        HttpPlatformClient::new().context("Failed to build platform HTTP client")?;
    let factory = ConnectorFactory::new(store, sessions, Arc::new(platform));
    let roster_service = RosterService::new(factory, signing_key);
    let renderer = RosterRenderer::new()?;

    Ok(app(roster_service, renderer))
}

pub async fn run(config: ServeConfig) -> Result<()> {
    let seed = SeedConfig::from_env().context("Invalid registration configuration")?;
    let signing_key =
        signing_key_from_env(&config.key_id).context("Invalid signing key configuration")?;

    let sessions: Arc<dyn LaunchSessionProvider> = Arc::new(InMemoryLaunchSessionStore::new());
    let app = build_app(&config, &seed, signing_key, sessions.clone()).await?;
    let eviction = tokio::spawn(evict_sessions(sessions));

    let listener = TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.addr))?;

    info!(addr = %config.addr, key_id = %config.key_id, "LTI tool listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("HTTP server failed")?;

    eviction.abort();
    info!("LTI tool shutting down");

    Ok(())
}

async fn evict_sessions(sessions: Arc<dyn LaunchSessionProvider>) {
    let mut interval = tokio::time::interval(SESSION_EVICTION_INTERVAL);
    loop {
        interval.tick().await;
        match sessions.evict_expired(Utc::now()).await {
            Ok(0) => {}
            Ok(evicted) => debug!(evicted, "Evicted expired launch sessions"),
            Err(e) => error!(error = %e, "Failed to evict launch sessions"),
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
