// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! List store: named domain lists backed by flat files.
//!
//! Each list is a named collection of entries of one of two kinds and is
//! durably stored as one UTF-8 text file in a kind-specific directory; the
//! list name is the file name. The in-memory form is a [`DomainTrie`]
//! rebuilt from the entries whenever the durable form changes and published
//! behind an [`Arc`] so readers can hold a snapshot across a match while
//! writers swap in a new root.
//!
//! Generated files carry a two-line comment header (marker + RFC-3339
//! timestamp); readers tolerate any header as comments.

use crate::constants::{KIND_BLOCKLIST, KIND_WHITELIST, LIST_FILE_HEADER, LIST_FILE_UPDATE_PREFIX};
use crate::entry::Entry;
use crate::errors::EngineError;
use crate::trie::DomainTrie;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// The two list flavors.
///
/// The same two values double as client modes. On the wire (URL segments,
/// JSON fields, the client document) they are spelled `blocklist` and
/// `whitelist`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListKind {
    /// Deny matching names
    #[serde(rename = "blocklist")]
    Block,
    /// Permit matching names
    #[serde(rename = "whitelist")]
    Allow,
}

impl ListKind {
    /// Parse a wire name (`blocklist` / `whitelist`).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::BadKind`] for any other string.
    pub fn from_wire(kind: &str) -> Result<Self, EngineError> {
        match kind {
            KIND_BLOCKLIST => Ok(Self::Block),
            KIND_WHITELIST => Ok(Self::Allow),
            other => Err(EngineError::BadKind(other.to_string())),
        }
    }

    /// The wire name of this kind.
    #[must_use]
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Block => KIND_BLOCKLIST,
            Self::Allow => KIND_WHITELIST,
        }
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Per-list metadata returned by the listing endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListMeta {
    /// List name (also the file name)
    pub name: String,
    /// List kind, wire-spelled
    #[serde(rename = "type")]
    pub kind: ListKind,
    /// Number of endpoint nodes in the trie (not file lines)
    pub count: usize,
    /// Modification time of the backing file
    #[serde(rename = "lastModified")]
    pub last_modified: DateTime<Utc>,
}

/// Named domain lists of both kinds, loaded into tries.
///
/// The store itself is unsynchronized; the engine serializes access
/// through its reader/writer lock. All mutators keep the backing file and
/// the published trie in step: the in-memory swap happens only after the
/// file write succeeded.
#[derive(Debug)]
pub struct ListStore {
    block_dir: PathBuf,
    allow_dir: PathBuf,
    block: BTreeMap<String, Arc<DomainTrie>>,
    allow: BTreeMap<String, Arc<DomainTrie>>,
}

impl ListStore {
    /// Create a store over the two kind directories. No I/O happens here;
    /// call [`ListStore::ensure_dirs`] during bootstrap.
    #[must_use]
    pub fn new(block_dir: impl Into<PathBuf>, allow_dir: impl Into<PathBuf>) -> Self {
        Self {
            block_dir: block_dir.into(),
            allow_dir: allow_dir.into(),
            block: BTreeMap::new(),
            allow: BTreeMap::new(),
        }
    }

    /// Create both kind directories if absent.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Internal`] when a directory cannot be created.
    pub async fn ensure_dirs(&self) -> Result<(), EngineError> {
        tokio::fs::create_dir_all(&self.block_dir).await?;
        tokio::fs::create_dir_all(&self.allow_dir).await?;
        Ok(())
    }

    fn dir(&self, kind: ListKind) -> &Path {
        match kind {
            ListKind::Block => &self.block_dir,
            ListKind::Allow => &self.allow_dir,
        }
    }

    fn file_path(&self, kind: ListKind, name: &str) -> PathBuf {
        self.dir(kind).join(name)
    }

    fn tries(&self, kind: ListKind) -> &BTreeMap<String, Arc<DomainTrie>> {
        match kind {
            ListKind::Block => &self.block,
            ListKind::Allow => &self.allow,
        }
    }

    fn tries_mut(&mut self, kind: ListKind) -> &mut BTreeMap<String, Arc<DomainTrie>> {
        match kind {
            ListKind::Block => &mut self.block,
            ListKind::Allow => &mut self.allow,
        }
    }

    fn describe(kind: ListKind, name: &str) -> String {
        format!("{kind} '{name}'")
    }

    /// List names become file names; anything that could escape the kind
    /// directory is rejected up front.
    fn validate_name(name: &str) -> Result<(), EngineError> {
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains('/')
            || name.contains('\\')
        {
            return Err(EngineError::BadEntry {
                entry: name.to_string(),
                reason: "list name must be a single path component".to_string(),
            });
        }
        Ok(())
    }

    /// Parse request-supplied entry strings, skipping comments and blanks.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::BadEntry`] on the first malformed entry.
    pub fn parse_domains(domains: &[String]) -> Result<Vec<Entry>, EngineError> {
        let mut entries = Vec::with_capacity(domains.len());
        for line in domains {
            if let Some(entry) = Entry::parse_line(line)? {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    /// Whether a list of this kind is currently loaded.
    #[must_use]
    pub fn contains(&self, kind: ListKind, name: &str) -> bool {
        self.tries(kind).contains_key(name)
    }

    /// Snapshot handle to a loaded list's trie.
    #[must_use]
    pub fn trie(&self, kind: ListKind, name: &str) -> Option<Arc<DomainTrie>> {
        self.tries(kind).get(name).cloned()
    }

    /// Create a new list: build its trie, write its file, publish it.
    ///
    /// File presence on disk is authoritative even when the list is not
    /// loaded, so an unreferenced on-disk list is never overwritten.
    ///
    /// # Errors
    ///
    /// [`EngineError::AlreadyExists`] when the name is taken in memory or
    /// on disk, [`EngineError::BadEntry`] from entry parsing,
    /// [`EngineError::Internal`] on file-system failure.
    pub async fn create(
        &mut self,
        kind: ListKind,
        name: &str,
        entries: &[Entry],
    ) -> Result<(), EngineError> {
        Self::validate_name(name)?;
        if self.contains(kind, name) {
            return Err(EngineError::AlreadyExists(Self::describe(kind, name)));
        }
        let path = self.file_path(kind, name);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(EngineError::AlreadyExists(Self::describe(kind, name)));
        }

        let trie = DomainTrie::from_entries(entries);
        self.write_file(kind, name, &trie).await?;
        self.tries_mut(kind).insert(name.to_string(), Arc::new(trie));
        debug!(list = %name, kind = %kind, entries = entries.len(), "list created");
        Ok(())
    }

    /// Replace a list's entries wholesale: rebuild, rewrite, swap.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] when the list is not loaded,
    /// [`EngineError::Internal`] on file-system failure.
    pub async fn update(
        &mut self,
        kind: ListKind,
        name: &str,
        entries: &[Entry],
    ) -> Result<(), EngineError> {
        if !self.contains(kind, name) {
            return Err(EngineError::NotFound(Self::describe(kind, name)));
        }
        let trie = DomainTrie::from_entries(entries);
        self.write_file(kind, name, &trie).await?;
        self.tries_mut(kind).insert(name.to_string(), Arc::new(trie));
        Ok(())
    }

    /// Drop a list and delete its file.
    ///
    /// A failed unlink after the in-memory removal is logged, not
    /// surfaced; the list is gone either way and the stale file is
    /// unreferenced.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] when the list is not loaded.
    pub async fn delete(&mut self, kind: ListKind, name: &str) -> Result<(), EngineError> {
        if self.tries_mut(kind).remove(name).is_none() {
            return Err(EngineError::NotFound(Self::describe(kind, name)));
        }
        let path = self.file_path(kind, name);
        if let Err(err) = tokio::fs::remove_file(&path).await {
            warn!(list = %name, kind = %kind, error = %err, "failed to delete list file");
        }
        Ok(())
    }

    /// Merge additional entries into an existing list.
    ///
    /// The trie is mutated in place (copy-on-write when a reader still
    /// holds the previous snapshot), then re-enumerated for the rewrite.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] when the list is not loaded,
    /// [`EngineError::Internal`] on file-system failure.
    pub async fn add_entries(
        &mut self,
        kind: ListKind,
        name: &str,
        entries: &[Entry],
    ) -> Result<(), EngineError> {
        let Some(slot) = self.tries_mut(kind).get_mut(name) else {
            return Err(EngineError::NotFound(Self::describe(kind, name)));
        };
        let trie = Arc::make_mut(slot);
        for entry in entries {
            trie.insert(entry);
        }
        let snapshot = slot.clone();
        self.write_file(kind, name, &snapshot).await
    }

    /// Remove entries by base domain.
    ///
    /// The list is rebuilt from its enumerated entries minus every entry
    /// whose base domain equals a removal entry's base domain; exceptions
    /// on the removal request are ignored.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] when the list is not loaded,
    /// [`EngineError::Internal`] on file-system failure.
    pub async fn remove_entries(
        &mut self,
        kind: ListKind,
        name: &str,
        entries: &[Entry],
    ) -> Result<(), EngineError> {
        let Some(current) = self.tries(kind).get(name) else {
            return Err(EngineError::NotFound(Self::describe(kind, name)));
        };
        let kept: Vec<Entry> = current
            .enumerate()
            .into_iter()
            .filter(|existing| !entries.iter().any(|removal| removal.same_domain(existing)))
            .collect();

        let trie = DomainTrie::from_entries(&kept);
        self.write_file(kind, name, &trie).await?;
        self.tries_mut(kind).insert(name.to_string(), Arc::new(trie));
        Ok(())
    }

    /// Enumerate a list's current entries, sorted.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] when the list is not loaded.
    pub fn get(&self, kind: ListKind, name: &str) -> Result<Vec<Entry>, EngineError> {
        let Some(trie) = self.tries(kind).get(name) else {
            return Err(EngineError::NotFound(Self::describe(kind, name)));
        };
        let mut entries = trie.enumerate();
        entries.sort();
        Ok(entries)
    }

    /// Metadata for every loaded list, optionally restricted to one kind.
    pub async fn meta(&self, kind: Option<ListKind>) -> Vec<ListMeta> {
        let kinds: &[ListKind] = match kind {
            Some(ListKind::Block) => &[ListKind::Block],
            Some(ListKind::Allow) => &[ListKind::Allow],
            None => &[ListKind::Block, ListKind::Allow],
        };
        let mut out = Vec::new();
        for &kind in kinds {
            for (name, trie) in self.tries(kind) {
                out.push(ListMeta {
                    name: name.clone(),
                    kind,
                    count: trie.len(),
                    last_modified: self.last_modified(kind, name).await,
                });
            }
        }
        out
    }

    /// Modification time of the backing file; current time when the file
    /// is missing (deletion race).
    async fn last_modified(&self, kind: ListKind, name: &str) -> DateTime<Utc> {
        let path = self.file_path(kind, name);
        match tokio::fs::metadata(&path).await.and_then(|m| m.modified()) {
            Ok(mtime) => DateTime::<Utc>::from(mtime),
            Err(_) => Utc::now(),
        }
    }

    /// Load a list from its on-disk file if present.
    ///
    /// Returns `Ok(true)` when the list is loaded afterwards (including
    /// the already-loaded case) and `Ok(false)` when no file exists.
    /// Malformed lines are logged and skipped: list files are normally
    /// machine-written, and a hand edit must not take the resolver down.
    ///
    /// # Errors
    ///
    /// [`EngineError::Internal`] when an existing file cannot be read.
    pub async fn load_from_disk(&mut self, kind: ListKind, name: &str) -> Result<bool, EngineError> {
        if self.contains(kind, name) {
            return Ok(true);
        }
        Self::validate_name(name)?;
        let path = self.file_path(kind, name);
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(err) => return Err(err.into()),
        };

        let mut trie = DomainTrie::new();
        for (number, line) in text.lines().enumerate() {
            match Entry::parse_line(line) {
                Ok(Some(entry)) => trie.insert(&entry),
                Ok(None) => {}
                Err(err) => {
                    warn!(
                        list = %name,
                        kind = %kind,
                        line = number + 1,
                        error = %err,
                        "skipping malformed list entry"
                    );
                }
            }
        }
        debug!(list = %name, kind = %kind, entries = trie.len(), "list loaded from disk");
        self.tries_mut(kind).insert(name.to_string(), Arc::new(trie));
        Ok(true)
    }

    /// Rewrite a list file from a trie: generated header, then the
    /// enumerated entries sorted for stable output.
    async fn write_file(
        &self,
        kind: ListKind,
        name: &str,
        trie: &DomainTrie,
    ) -> Result<(), EngineError> {
        let mut entries = trie.enumerate();
        entries.sort();

        let mut text = String::new();
        text.push_str(LIST_FILE_HEADER);
        text.push('\n');
        text.push_str(LIST_FILE_UPDATE_PREFIX);
        text.push_str(&Utc::now().to_rfc3339());
        text.push('\n');
        for entry in &entries {
            text.push_str(&entry.to_string());
            text.push('\n');
        }

        tokio::fs::write(self.file_path(kind, name), text).await?;
        Ok(())
    }
}
