// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Lookup probe.
//!
//! Runs the exact evaluation the DNS path uses, so policies can be probed
//! without sending DNS traffic.

use super::types::CheckResponse;
use super::ApiError;
use crate::engine::FilterEngine;
use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;

/// `GET /api/check/{ip}/{domain}` - would this query be forwarded?
pub async fn check(
    State(engine): State<Arc<FilterEngine>>,
    Path((ip, domain)): Path<(String, String)>,
) -> Result<Json<CheckResponse>, ApiError> {
    let decision = engine.decide(&ip, &domain).await;
    Ok(Json(CheckResponse {
        client_ip: ip,
        domain,
        allowed: decision.is_allowed(),
    }))
}
