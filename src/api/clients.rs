// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Client resource handlers.

use super::types::{ApiJson, ClientResource};
use super::{no_content, ApiError};
use crate::engine::FilterEngine;
use crate::errors::EngineError;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

/// `GET /api/clients` - every client policy, with ips filled in.
pub async fn list_all(
    State(engine): State<Arc<FilterEngine>>,
) -> Result<Json<Vec<ClientResource>>, ApiError> {
    let clients = engine
        .list_clients()
        .await
        .into_iter()
        .map(|(ip, policy)| ClientResource::from_policy(ip, policy))
        .collect();
    Ok(Json(clients))
}

/// `GET /api/clients/{ip}` - one client policy.
pub async fn get_one(
    State(engine): State<Arc<FilterEngine>>,
    Path(ip): Path<String>,
) -> Result<Json<ClientResource>, ApiError> {
    let policy = engine.get_client(&ip).await?;
    Ok(Json(ClientResource::from_policy(ip, policy)))
}

/// `POST /api/clients` - register a client; the body must carry the ip.
pub async fn create(
    State(engine): State<Arc<FilterEngine>>,
    ApiJson(body): ApiJson<ClientResource>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(ip) = body.ip.clone().filter(|ip| !ip.is_empty()) else {
        return Err(ApiError(EngineError::BadJson(
            "missing 'ip' field".to_string(),
        )));
    };
    let policy = body.into_policy();
    engine.create_client(&ip, policy.clone()).await?;
    Ok((
        StatusCode::CREATED,
        Json(ClientResource::from_policy(ip, policy)),
    ))
}

/// `PUT /api/clients/{ip}` - replace a policy; the URL ip wins over any
/// ip in the body.
pub async fn update(
    State(engine): State<Arc<FilterEngine>>,
    Path(ip): Path<String>,
    ApiJson(body): ApiJson<ClientResource>,
) -> Result<Json<ClientResource>, ApiError> {
    let policy = body.into_policy();
    engine.update_client(&ip, policy.clone()).await?;
    Ok(Json(ClientResource::from_policy(ip, policy)))
}

/// `DELETE /api/clients/{ip}` - drop a policy. No cascade.
pub async fn remove(
    State(engine): State<Arc<FilterEngine>>,
    Path(ip): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    engine.delete_client(&ip).await?;
    Ok(no_content())
}
