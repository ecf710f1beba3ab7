// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! List resource handlers.

use super::types::{ApiJson, CreateListRequest, DomainsRequest, ListResource};
use super::{no_content, ApiError};
use crate::engine::FilterEngine;
use crate::lists::{ListKind, ListMeta};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

fn resource(name: String, kind: ListKind, domains: Vec<String>) -> Json<ListResource> {
    Json(ListResource {
        name,
        kind,
        domains,
    })
}

/// `GET /api/lists` - metadata for every loaded list of both kinds.
pub async fn list_all(
    State(engine): State<Arc<FilterEngine>>,
) -> Result<Json<Vec<ListMeta>>, ApiError> {
    Ok(Json(engine.list_meta(None).await))
}

/// `GET /api/lists/{kind}` - metadata for one kind.
pub async fn list_kind(
    State(engine): State<Arc<FilterEngine>>,
    Path(kind): Path<String>,
) -> Result<Json<Vec<ListMeta>>, ApiError> {
    let kind = ListKind::from_wire(&kind)?;
    Ok(Json(engine.list_meta(Some(kind)).await))
}

/// `GET /api/lists/{kind}/{name}` - one list with its entries.
pub async fn get_one(
    State(engine): State<Arc<FilterEngine>>,
    Path((kind, name)): Path<(String, String)>,
) -> Result<Json<ListResource>, ApiError> {
    let kind = ListKind::from_wire(&kind)?;
    let domains = engine.get_list(kind, &name).await?;
    Ok(resource(name, kind, domains))
}

/// `POST /api/lists/{kind}` - create a list; the kind comes from the URL.
pub async fn create(
    State(engine): State<Arc<FilterEngine>>,
    Path(kind): Path<String>,
    ApiJson(body): ApiJson<CreateListRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = ListKind::from_wire(&kind)?;
    let domains = engine.create_list(kind, &body.name, &body.domains).await?;
    Ok((StatusCode::CREATED, resource(body.name, kind, domains)))
}

/// `PUT /api/lists/{kind}/{name}` - replace a list's entries; name and
/// kind in the body are overridden from the URL.
pub async fn update(
    State(engine): State<Arc<FilterEngine>>,
    Path((kind, name)): Path<(String, String)>,
    ApiJson(body): ApiJson<DomainsRequest>,
) -> Result<Json<ListResource>, ApiError> {
    let kind = ListKind::from_wire(&kind)?;
    let domains = engine.update_list(kind, &name, &body.into_domains()).await?;
    Ok(resource(name, kind, domains))
}

/// `DELETE /api/lists/{kind}/{name}` - drop a list and repair client refs.
pub async fn remove(
    State(engine): State<Arc<FilterEngine>>,
    Path((kind, name)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = ListKind::from_wire(&kind)?;
    engine.delete_list(kind, &name).await?;
    Ok(no_content())
}

/// `POST /api/lists/{kind}/{name}/domains` - merge entries into a list.
pub async fn add_domains(
    State(engine): State<Arc<FilterEngine>>,
    Path((kind, name)): Path<(String, String)>,
    ApiJson(body): ApiJson<DomainsRequest>,
) -> Result<Json<ListResource>, ApiError> {
    let kind = ListKind::from_wire(&kind)?;
    let domains = engine.add_domains(kind, &name, &body.into_domains()).await?;
    Ok(resource(name, kind, domains))
}

/// `DELETE /api/lists/{kind}/{name}/domains` - remove entries by base
/// domain.
pub async fn remove_domains(
    State(engine): State<Arc<FilterEngine>>,
    Path((kind, name)): Path<(String, String)>,
    ApiJson(body): ApiJson<DomainsRequest>,
) -> Result<Json<ListResource>, ApiError> {
    let kind = ListKind::from_wire(&kind)?;
    let domains = engine
        .remove_domains(kind, &name, &body.into_domains())
        .await?;
    Ok(resource(name, kind, domains))
}
