// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use axum::{
    extract::{ConnectInfo, Form, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::application::connector::ConnectorError;
use crate::application::roster_service::RosterService;
use crate::domain::key::JwkSet;
use crate::domain::launch::LaunchId;
use crate::presentation::render::RosterRenderer;

pub struct AppState {
    pub roster_service: RosterService,
    pub renderer: RosterRenderer,
}

pub fn app(roster_service: RosterService, renderer: RosterRenderer) -> Router {
    let state = Arc::new(AppState {
        roster_service,
        renderer,
    });

    Router::new()
        .route("/launch", get(launch_query).post(launch_form))
        .route("/keyset", get(keyset))
        .route("/health", get(health))
        .with_state(state)
        .layer(middleware::from_fn(log_request))
        .layer(TraceLayer::new_for_http())
}

#[derive(Debug, Deserialize)]
pub struct LaunchParams {
    pub launch_id: Option<String>,
}

async fn launch_query(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LaunchParams>,
) -> Result<Html<String>, ApiError> {
    complete_launch(&state, params).await
}

async fn launch_form(
    State(state): State<Arc<AppState>>,
    Form(params): Form<LaunchParams>,
) -> Result<Html<String>, ApiError> {
    complete_launch(&state, params).await
}

/// Launch completion handler: fetch the roster and render it.
async fn complete_launch(state: &AppState, params: LaunchParams) -> Result<Html<String>, ApiError> {
    let launch_id = params
        .launch_id
        .filter(|id| !id.trim().is_empty())
        .map(|id| LaunchId(id.trim().to_string()))
        .ok_or(ApiError::MissingLaunchId)?;

    let view = state.roster_service.roster_for_launch(&launch_id).await?;
    let html = state.renderer.render(&view).map_err(ApiError::Render)?;
    Ok(Html(html))
}

async fn keyset(State(state): State<Arc<AppState>>) -> Json<JwkSet> {
    Json(JwkSet::from_keys([state.roster_service.signing_key()]))
}

async fn health() -> &'static str {
    "OK"
}

/// Logs uri, method and remote address of every request.
async fn log_request(request: Request, next: Next) -> Response {
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "-".to_string());

    info!(
        uri = %request.uri(),
        method = %request.method(),
        remote_addr = %remote_addr,
        "request"
    );

    next.run(request).await
}

/// Per-request failures. Every variant is answered with an opaque 500.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Request carries no launch id")]
    MissingLaunchId,

    #[error(transparent)]
    Connector(#[from] ConnectorError),

    #[error("Rendering failed: {0:#}")]
    Render(anyhow::Error),
}

impl ApiError {
    fn class(&self) -> &'static str {
        match self {
            ApiError::MissingLaunchId => "bad_request",
            ApiError::Connector(e) => e.class(),
            ApiError::Render(_) => "render",
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            ApiError::Connector(e) => e.is_retryable(),
            _ => false,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(
            error = %self,
            class = self.class(),
            retryable = self.is_retryable(),
            "Launch request failed"
        );
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
    }
}
