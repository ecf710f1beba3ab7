// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Wire types for the control plane.
//!
//! Request bodies are lenient where the URL is authoritative: a list PUT
//! may omit (or lie about) `name` and `type`, a client PUT may omit `ip`;
//! the server overrides those fields from the path. Responses always echo
//! the stored resource in full.

use super::ApiError;
use crate::clients::ClientPolicy;
use crate::errors::EngineError;
use crate::lists::ListKind;
use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// The `{"error": "<message>"}` envelope used by every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable error message
    pub error: String,
}

/// A list as exposed by the API.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListResource {
    /// List name, unique within its kind
    pub name: String,
    /// Wire-spelled kind
    #[serde(rename = "type")]
    pub kind: ListKind,
    /// Formatted entries, sorted
    pub domains: Vec<String>,
}

/// Body of `POST /api/lists/{kind}`; the kind comes from the URL.
#[derive(Debug, Deserialize)]
pub struct CreateListRequest {
    /// Name of the new list
    pub name: String,
    /// Initial entries
    #[serde(default)]
    pub domains: Vec<String>,
}

/// Body of list PUT and of the entry add/remove endpoints.
///
/// `name` and `type` are accepted and ignored (the URL wins). The entry
/// set may arrive as `domains` or, for single-entry removal requests, as
/// a singular `domain`.
#[derive(Debug, Deserialize)]
pub struct DomainsRequest {
    /// Entry strings
    #[serde(default)]
    pub domains: Vec<String>,
    /// Alternative singular spelling
    #[serde(default)]
    pub domain: Option<String>,
}

impl DomainsRequest {
    /// The union of the plural and singular fields.
    #[must_use]
    pub fn into_domains(self) -> Vec<String> {
        let mut domains = self.domains;
        if let Some(domain) = self.domain {
            domains.push(domain);
        }
        domains
    }
}

/// A client policy as exposed by the API.
///
/// `ip` is the primary key: required on POST, overridden from the URL on
/// PUT, always present in responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClientResource {
    /// Client IP address string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    /// Referenced blocklist names
    #[serde(default)]
    pub blocklists: Vec<String>,
    /// Referenced whitelist names
    #[serde(default)]
    pub whitelists: Vec<String>,
    /// Evaluation mode
    pub mode: ListKind,
}

impl ClientResource {
    /// Build the API form of a stored (ip, policy) pair.
    #[must_use]
    pub fn from_policy(ip: String, policy: ClientPolicy) -> Self {
        Self {
            ip: Some(ip),
            blocklists: policy.blocklists,
            whitelists: policy.whitelists,
            mode: policy.mode,
        }
    }

    /// The registry form of this resource.
    #[must_use]
    pub fn into_policy(self) -> ClientPolicy {
        ClientPolicy {
            blocklists: self.blocklists,
            whitelists: self.whitelists,
            mode: self.mode,
        }
    }
}

/// Response of `GET /api/check/{ip}/{domain}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckResponse {
    /// The client the policy was evaluated for
    #[serde(rename = "clientIP")]
    pub client_ip: String,
    /// The name that was evaluated
    pub domain: String,
    /// Whether the query would be forwarded
    pub allowed: bool,
}

/// JSON extractor whose rejection is the standard error envelope.
///
/// Axum's stock `Json` rejection is plain text; the control plane
/// promises `{"error": ...}` with status 400 for every undecodable body.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError(EngineError::BadJson(rejection.body_text()))),
        }
    }
}
