// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The process-wide filtering engine.
//!
//! [`FilterEngine`] owns the list store and the client registry behind a
//! single reader/writer lock and exposes the two faces of the system:
//!
//! - the read path ([`FilterEngine::decide`]) used by the DNS handler and
//!   the check endpoint, safe to call from many workers at once;
//! - the write path (list and client mutations) used by the control
//!   plane, serialized by the exclusive side of the lock.
//!
//! One engine is constructed per process during plugin setup and handed
//! via `Arc` to the HTTP server and the DNS handler; there is no global
//! state. Readers capture trie snapshots under the shared lock and
//! release it before matching, so writer hold time (trie rebuild plus
//! file write) never stalls an in-flight match.

use crate::clients::{ClientPolicy, ClientRegistry};
use crate::constants::{DEFAULT_BLOCKLIST_DIR, DEFAULT_CLIENTS_FILE, DEFAULT_WHITELIST_DIR};
use crate::errors::EngineError;
use crate::lists::{ListKind, ListMeta, ListStore};
use crate::metrics;
use crate::trie::DomainTrie;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Construction-time parameters of the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Path of the persisted client-policy document
    pub clients_file: PathBuf,
    /// Directory holding blocklist files
    pub blocklist_dir: PathBuf,
    /// Directory holding whitelist files
    pub whitelist_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            clients_file: PathBuf::from(DEFAULT_CLIENTS_FILE),
            blocklist_dir: PathBuf::from(DEFAULT_BLOCKLIST_DIR),
            whitelist_dir: PathBuf::from(DEFAULT_WHITELIST_DIR),
        }
    }
}

/// Outcome of a policy evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Forward the query down the plugin chain
    Allow,
    /// Answer with a non-existence response
    Deny,
}

impl Decision {
    /// Whether the query may proceed.
    #[must_use]
    pub fn is_allowed(self) -> bool {
        matches!(self, Self::Allow)
    }
}

struct EngineState {
    lists: ListStore,
    clients: ClientRegistry,
}

/// The per-process filtering engine.
///
/// See the module docs for the ownership and locking model.
pub struct FilterEngine {
    state: RwLock<EngineState>,
}

impl FilterEngine {
    /// Construct the engine: ensure the kind directories exist, load the
    /// client document, then load and trie-build every list referenced by
    /// any client. Lists present on disk but unreferenced stay unloaded
    /// until a client references them.
    ///
    /// Called exactly once per process by the composition root.
    ///
    /// # Errors
    ///
    /// [`EngineError::Internal`] when a directory cannot be created or the
    /// client document cannot be read, [`EngineError::BadJson`] when the
    /// document does not parse. A referenced list that is missing or
    /// unreadable is logged and skipped, not fatal.
    pub async fn bootstrap(config: EngineConfig) -> Result<Arc<Self>, EngineError> {
        let mut lists = ListStore::new(config.blocklist_dir, config.whitelist_dir);
        lists.ensure_dirs().await?;

        let mut clients = ClientRegistry::new(config.clients_file);
        clients.load().await?;

        for (ip, policy) in clients.all() {
            for kind in [ListKind::Block, ListKind::Allow] {
                for name in policy.refs(kind) {
                    match lists.load_from_disk(kind, name).await {
                        Ok(true) => {}
                        Ok(false) => warn!(
                            client = %ip,
                            list = %name,
                            kind = %kind,
                            "policy references a list with no backing file"
                        ),
                        Err(err) => warn!(
                            client = %ip,
                            list = %name,
                            kind = %kind,
                            error = %err,
                            "failed to load referenced list"
                        ),
                    }
                }
            }
        }

        let loaded = lists.meta(None).await.len();
        info!(clients = clients.all().len(), lists = loaded, "filter engine ready");

        Ok(Arc::new(Self {
            state: RwLock::new(EngineState { lists, clients }),
        }))
    }

    // ------------------------------------------------------------------
    // Read path
    // ------------------------------------------------------------------

    /// Evaluate a query name against a client's policy.
    ///
    /// Unknown clients are denied. In `blocklist` mode a name matched by
    /// any referenced blocklist is denied and everything else allowed; in
    /// `whitelist` mode a name matched by any referenced whitelist is
    /// allowed and everything else denied. A policy ref naming a list
    /// that is not loaded is skipped.
    ///
    /// The evaluation is pure over a snapshot: trie handles are captured
    /// under the shared lock, which is released before matching.
    pub async fn decide(&self, ip: &str, name: &str) -> Decision {
        let (mode, tries) = {
            let state = self.state.read().await;
            let Some(policy) = state.clients.get(ip) else {
                debug!(client = %ip, domain = %name, "unknown client, denying");
                metrics::record_decision(false);
                return Decision::Deny;
            };
            let mode = policy.mode;
            let tries: Vec<Arc<DomainTrie>> = policy
                .refs(mode)
                .iter()
                .filter_map(|list| {
                    let trie = state.lists.trie(mode, list);
                    if trie.is_none() {
                        debug!(client = %ip, list = %list, "policy references unloaded list, skipping");
                    }
                    trie
                })
                .collect();
            (mode, tries)
        };

        let matched = tries.iter().any(|trie| trie.matches(name));
        let decision = match (mode, matched) {
            (ListKind::Block, true) | (ListKind::Allow, false) => Decision::Deny,
            (ListKind::Block, false) | (ListKind::Allow, true) => Decision::Allow,
        };
        debug!(client = %ip, domain = %name, mode = %mode, decision = ?decision, "evaluated");
        metrics::record_decision(decision.is_allowed());
        decision
    }

    // ------------------------------------------------------------------
    // List mutations
    // ------------------------------------------------------------------

    /// Create a list and return its stored entries.
    ///
    /// # Errors
    ///
    /// See [`ListStore::create`]; entry strings are parsed first and
    /// reject with [`EngineError::BadEntry`].
    pub async fn create_list(
        &self,
        kind: ListKind,
        name: &str,
        domains: &[String],
    ) -> Result<Vec<String>, EngineError> {
        let entries = ListStore::parse_domains(domains)?;
        let mut state = self.state.write().await;
        state.lists.create(kind, name, &entries).await?;
        formatted(&state.lists, kind, name)
    }

    /// Replace a list's entries and return the stored result.
    ///
    /// # Errors
    ///
    /// See [`ListStore::update`].
    pub async fn update_list(
        &self,
        kind: ListKind,
        name: &str,
        domains: &[String],
    ) -> Result<Vec<String>, EngineError> {
        let entries = ListStore::parse_domains(domains)?;
        let mut state = self.state.write().await;
        state.lists.update(kind, name, &entries).await?;
        formatted(&state.lists, kind, name)
    }

    /// Delete a list and strip it from every client policy.
    ///
    /// Both steps happen under one exclusive acquisition, so no reader
    /// observes a policy referencing the dropped trie.
    ///
    /// # Errors
    ///
    /// See [`ListStore::delete`].
    pub async fn delete_list(&self, kind: ListKind, name: &str) -> Result<(), EngineError> {
        let mut state = self.state.write().await;
        state.lists.delete(kind, name).await?;
        state.clients.repair_after_list_deletion(kind, name).await;
        Ok(())
    }

    /// Merge entries into a list and return the stored result.
    ///
    /// # Errors
    ///
    /// See [`ListStore::add_entries`].
    pub async fn add_domains(
        &self,
        kind: ListKind,
        name: &str,
        domains: &[String],
    ) -> Result<Vec<String>, EngineError> {
        let entries = ListStore::parse_domains(domains)?;
        let mut state = self.state.write().await;
        state.lists.add_entries(kind, name, &entries).await?;
        formatted(&state.lists, kind, name)
    }

    /// Remove entries (matched by base domain) and return the remainder.
    ///
    /// # Errors
    ///
    /// See [`ListStore::remove_entries`].
    pub async fn remove_domains(
        &self,
        kind: ListKind,
        name: &str,
        domains: &[String],
    ) -> Result<Vec<String>, EngineError> {
        let entries = ListStore::parse_domains(domains)?;
        let mut state = self.state.write().await;
        state.lists.remove_entries(kind, name, &entries).await?;
        formatted(&state.lists, kind, name)
    }

    /// A list's current entries, formatted and sorted.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] when the list is not loaded.
    pub async fn get_list(&self, kind: ListKind, name: &str) -> Result<Vec<String>, EngineError> {
        let state = self.state.read().await;
        formatted(&state.lists, kind, name)
    }

    /// Metadata for loaded lists, optionally restricted to one kind.
    pub async fn list_meta(&self, kind: Option<ListKind>) -> Vec<ListMeta> {
        let state = self.state.read().await;
        state.lists.meta(kind).await
    }

    // ------------------------------------------------------------------
    // Client mutations
    // ------------------------------------------------------------------

    /// Register a new client policy.
    ///
    /// Every referenced list must exist; a reference to an on-disk list
    /// that is not yet loaded loads it now.
    ///
    /// # Errors
    ///
    /// [`EngineError::AlreadyExists`] for a known ip,
    /// [`EngineError::ReferencedListMissing`] for a dangling ref.
    pub async fn create_client(&self, ip: &str, policy: ClientPolicy) -> Result<(), EngineError> {
        let mut state = self.state.write().await;
        if state.clients.contains(ip) {
            return Err(EngineError::AlreadyExists(format!("client '{ip}'")));
        }
        resolve_refs(&mut state.lists, &policy).await?;
        state.clients.upsert(ip, policy).await
    }

    /// Replace an existing client policy. Same validation as create.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] for an unknown ip,
    /// [`EngineError::ReferencedListMissing`] for a dangling ref.
    pub async fn update_client(&self, ip: &str, policy: ClientPolicy) -> Result<(), EngineError> {
        let mut state = self.state.write().await;
        if !state.clients.contains(ip) {
            return Err(EngineError::NotFound(format!("client '{ip}'")));
        }
        resolve_refs(&mut state.lists, &policy).await?;
        state.clients.upsert(ip, policy).await
    }

    /// Remove a client policy. No cascade.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] for an unknown ip.
    pub async fn delete_client(&self, ip: &str) -> Result<(), EngineError> {
        let mut state = self.state.write().await;
        state.clients.remove(ip).await
    }

    /// Deep copy of one client's policy.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] for an unknown ip.
    pub async fn get_client(&self, ip: &str) -> Result<ClientPolicy, EngineError> {
        let state = self.state.read().await;
        state
            .clients
            .get(ip)
            .ok_or_else(|| EngineError::NotFound(format!("client '{ip}'")))
    }

    /// Deep copies of every (ip, policy) pair.
    pub async fn list_clients(&self) -> Vec<(String, ClientPolicy)> {
        let state = self.state.read().await;
        state.clients.all()
    }
}

/// Formatted, sorted entries of a loaded list.
fn formatted(lists: &ListStore, kind: ListKind, name: &str) -> Result<Vec<String>, EngineError> {
    Ok(lists
        .get(kind, name)?
        .iter()
        .map(ToString::to_string)
        .collect())
}

/// Validate a policy's refs against the store, lazily loading on-disk
/// lists the first time a client references them.
async fn resolve_refs(lists: &mut ListStore, policy: &ClientPolicy) -> Result<(), EngineError> {
    for kind in [ListKind::Block, ListKind::Allow] {
        for name in policy.refs(kind) {
            if !lists.load_from_disk(kind, name).await? {
                return Err(EngineError::ReferencedListMissing {
                    kind: kind.wire_name().to_string(),
                    name: name.clone(),
                });
            }
        }
    }
    Ok(())
}
