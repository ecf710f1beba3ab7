// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Control-plane HTTP server.
//!
//! A single-listener axum router over the three resource kinds plus the
//! lookup probe:
//!
//! - `/api/lists` - list metadata, list CRUD, entry add/remove
//! - `/api/clients` - client policy CRUD
//! - `/api/check/{ip}/{domain}` - evaluate a name exactly like the DNS path
//!
//! All bodies are JSON and every response carries
//! `Content-Type: application/json`. Errors use the
//! `{"error": "<message>"}` envelope; conflicts return 400 for wire parity
//! with the original service rather than 409. Every request is logged and
//! bounded by a 30-second wall-clock timeout.

pub mod check;
pub mod clients;
pub mod lists;
pub mod types;

use crate::constants::REQUEST_TIMEOUT_SECS;
use crate::engine::FilterEngine;
use crate::errors::EngineError;
use crate::metrics;
use axum::extract::{ConnectInfo, Request};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use self::types::ErrorBody;
use tracing::info;

/// Engine error carried through a handler, rendered as the error envelope.
#[derive(Debug)]
pub struct ApiError(pub EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

impl ApiError {
    /// The status code each engine error kind maps onto.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self.0 {
            // The wire contract returns 400 for conflicts, not 409.
            EngineError::BadKind(_)
            | EngineError::BadEntry { .. }
            | EngineError::BadJson(_)
            | EngineError::AlreadyExists(_)
            | EngineError::ReferencedListMissing { .. } => StatusCode::BAD_REQUEST,
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::Timeout => StatusCode::REQUEST_TIMEOUT,
            EngineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// An empty success response that still carries the JSON content type.
#[must_use]
pub fn no_content() -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [(header::CONTENT_TYPE, "application/json")],
    )
}

/// Build the control-plane router around a shared engine.
#[must_use]
pub fn router(engine: Arc<FilterEngine>) -> Router {
    Router::new()
        .route("/api/lists", get(lists::list_all))
        .route("/api/lists/{kind}", get(lists::list_kind).post(lists::create))
        .route(
            "/api/lists/{kind}/{name}",
            get(lists::get_one).put(lists::update).delete(lists::remove),
        )
        .route(
            "/api/lists/{kind}/{name}/domains",
            post(lists::add_domains).delete(lists::remove_domains),
        )
        .route("/api/clients", get(clients::list_all).post(clients::create))
        .route(
            "/api/clients/{ip}",
            get(clients::get_one).put(clients::update).delete(clients::remove),
        )
        .route("/api/check/{ip}/{domain}", get(check::check))
        .layer(middleware::from_fn(enforce_timeout))
        .layer(middleware::from_fn(log_requests))
        .with_state(engine)
}

/// Log `METHOD PATH FROM REMOTE` for every request and count it once the
/// response status is known.
async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "unknown".to_string(), |info| info.0.to_string());
    info!("{method} {path} FROM {remote}");

    let response = next.run(request).await;
    metrics::record_api_request(method.as_str(), response.status().as_u16());
    response
}

/// Enforce the per-request wall-clock budget.
///
/// The handler may already be past its commit point when the budget
/// expires; the in-memory swap is atomic either way.
async fn enforce_timeout(request: Request, next: Next) -> Response {
    let budget = Duration::from_secs(REQUEST_TIMEOUT_SECS);
    match tokio::time::timeout(budget, next.run(request)).await {
        Ok(response) => response,
        Err(_) => ApiError(EngineError::Timeout).into_response(),
    }
}

/// Serve the control plane until the shutdown future resolves, then stop
/// accepting and drain in-flight requests.
///
/// # Errors
///
/// Returns the bind or serve error from the listener.
pub async fn serve(
    engine: Arc<FilterEngine>,
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("control plane listening on http://{addr}");
    axum::serve(
        listener,
        router(engine).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
}
