// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Client registry: per-client policies persisted as one JSON document.
//!
//! The document is a single JSON object keyed by client IP:
//!
//! ```json
//! {
//!   "10.0.0.1": {
//!     "blocklists": ["ads"],
//!     "whitelists": [],
//!     "mode": "blocklist"
//!   }
//! }
//! ```
//!
//! The document is the source of truth: it is loaded once at bootstrap
//! (absent file means an empty registry) and rewritten wholesale after
//! every mutation, with 2-space indentation. The `ip` key is only added
//! to a record when a client is returned through the API.

use crate::errors::EngineError;
use crate::lists::ListKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, warn};

/// One client's filtering policy.
///
/// `mode` selects which ref-set drives the decision: `blocklist` mode
/// denies names matched by any referenced blocklist, `whitelist` mode
/// permits only names matched by a referenced whitelist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientPolicy {
    /// Names of referenced blocklists
    #[serde(default)]
    pub blocklists: Vec<String>,
    /// Names of referenced whitelists
    #[serde(default)]
    pub whitelists: Vec<String>,
    /// Evaluation mode, wire-spelled like the kinds
    pub mode: ListKind,
}

impl ClientPolicy {
    /// The ref-set holding list names of the given kind.
    #[must_use]
    pub fn refs(&self, kind: ListKind) -> &[String] {
        match kind {
            ListKind::Block => &self.blocklists,
            ListKind::Allow => &self.whitelists,
        }
    }

    fn refs_mut(&mut self, kind: ListKind) -> &mut Vec<String> {
        match kind {
            ListKind::Block => &mut self.blocklists,
            ListKind::Allow => &mut self.whitelists,
        }
    }
}

/// The ip → policy map and its persistence discipline.
///
/// Like the list store, the registry is unsynchronized; the engine's
/// reader/writer lock serializes access.
#[derive(Debug)]
pub struct ClientRegistry {
    path: PathBuf,
    clients: BTreeMap<String, ClientPolicy>,
}

impl ClientRegistry {
    /// Create a registry persisted at `path`. No I/O happens here; call
    /// [`ClientRegistry::load`] during bootstrap.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            clients: BTreeMap::new(),
        }
    }

    /// Load the persisted document. A missing file yields an empty map.
    ///
    /// # Errors
    ///
    /// [`EngineError::Internal`] when the file exists but cannot be read,
    /// [`EngineError::BadJson`] when it does not parse.
    pub async fn load(&mut self) -> Result<(), EngineError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no client document, starting empty");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };
        self.clients = serde_json::from_str(&text)?;
        debug!(clients = self.clients.len(), "client registry loaded");
        Ok(())
    }

    /// Rewrite the whole document.
    ///
    /// # Errors
    ///
    /// [`EngineError::Internal`] on serialization or write failure.
    pub async fn persist(&self) -> Result<(), EngineError> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"  ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.clients
            .serialize(&mut serializer)
            .map_err(|err| EngineError::Internal(err.to_string()))?;
        buf.push(b'\n');
        tokio::fs::write(&self.path, buf).await?;
        Ok(())
    }

    /// Whether a policy exists for this client.
    #[must_use]
    pub fn contains(&self, ip: &str) -> bool {
        self.clients.contains_key(ip)
    }

    /// Deep copy of one client's policy.
    #[must_use]
    pub fn get(&self, ip: &str) -> Option<ClientPolicy> {
        self.clients.get(ip).cloned()
    }

    /// Deep copies of every (ip, policy) pair.
    #[must_use]
    pub fn all(&self) -> Vec<(String, ClientPolicy)> {
        self.clients
            .iter()
            .map(|(ip, policy)| (ip.clone(), policy.clone()))
            .collect()
    }

    /// Insert or replace a policy. Validation against the list store is
    /// the engine's job; the registry only persists.
    ///
    /// # Errors
    ///
    /// [`EngineError::Internal`] when the rewrite fails.
    pub async fn upsert(&mut self, ip: &str, policy: ClientPolicy) -> Result<(), EngineError> {
        self.clients.insert(ip.to_string(), policy);
        self.persist().await
    }

    /// Remove a client's policy. No cascade.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] when the client is unknown,
    /// [`EngineError::Internal`] when the rewrite fails.
    pub async fn remove(&mut self, ip: &str) -> Result<(), EngineError> {
        if self.clients.remove(ip).is_none() {
            return Err(EngineError::NotFound(format!("client '{ip}'")));
        }
        self.persist().await
    }

    /// Strip a deleted list from every policy's matching ref-set.
    ///
    /// The document is rewritten only when something changed; a failed
    /// rewrite is logged, not surfaced - the in-memory state is already
    /// repaired and the next successful mutation rewrites the document.
    pub async fn repair_after_list_deletion(&mut self, kind: ListKind, name: &str) {
        let mut changed = false;
        for policy in self.clients.values_mut() {
            let refs = policy.refs_mut(kind);
            let before = refs.len();
            refs.retain(|r| r != name);
            changed |= refs.len() != before;
        }
        if !changed {
            return;
        }
        debug!(list = %name, kind = %kind, "stripped deleted list from client policies");
        if let Err(err) = self.persist().await {
            warn!(
                list = %name,
                kind = %kind,
                error = %err,
                "failed to persist client document after list-deletion repair"
            );
        }
    }
}
