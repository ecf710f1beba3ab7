// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reverse-label domain trie.
//!
//! Domains are indexed by their labels in reverse order, so
//! `mail.example.com` occupies the path `com → example → mail`. A node
//! flagged as an *endpoint* matches its own name and every subdomain
//! beneath it, except for the subtrees named by the endpoint's exception
//! labels: an exception carves out exactly the immediately-next label and
//! everything below it.
//!
//! Tries are cheap to clone node-by-node; the list store relies on this
//! for copy-on-write mutation while readers hold a snapshot of the
//! previous root.

use crate::entry::Entry;
use std::collections::BTreeMap;

/// One trie node.
///
/// Exception labels live only on endpoint nodes and are kept as a small
/// sorted vector; the overwhelming majority of endpoints have none.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct TrieNode {
    children: BTreeMap<String, TrieNode>,
    endpoint: bool,
    exceptions: Vec<String>,
}

impl TrieNode {
    fn add_exceptions(&mut self, exceptions: &[String]) {
        for exception in exceptions {
            if let Err(pos) = self.exceptions.binary_search(exception) {
                self.exceptions.insert(pos, exception.clone());
            }
        }
    }

    fn has_exception(&self, label: &str) -> bool {
        self.exceptions
            .binary_search_by(|e| e.as_str().cmp(label))
            .is_ok()
    }
}

/// A reverse-label trie over domain entries.
///
/// The trie is a pure function of the entries inserted into it; the list
/// store rebuilds it from scratch whenever a list's durable form changes
/// and swaps the new root in atomically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainTrie {
    root: TrieNode,
    endpoints: usize,
}

impl DomainTrie {
    /// Create an empty trie.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a trie from a sequence of entries.
    #[must_use]
    pub fn from_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = &'a Entry>,
    {
        let mut trie = Self::new();
        for entry in entries {
            trie.insert(entry);
        }
        trie
    }

    /// Insert an entry.
    ///
    /// Inserting the same domain twice is idempotent; exception labels
    /// accumulate across inserts.
    pub fn insert(&mut self, entry: &Entry) {
        let mut node = &mut self.root;
        for label in entry.labels.iter().rev() {
            node = node.children.entry(label.clone()).or_default();
        }
        if !node.endpoint {
            node.endpoint = true;
            self.endpoints += 1;
        }
        node.add_exceptions(&entry.exceptions);
    }

    /// Whether `name` is covered by an endpoint in this trie.
    ///
    /// The name is case-folded and a trailing root dot is tolerated. The
    /// walk descends label-by-label from the TLD; the first endpoint
    /// crossed decides the outcome: the name matches unless the label
    /// immediately below that endpoint is one of its exceptions. A name
    /// equal to the endpoint itself always matches, since no next label
    /// remains for an exception to fire on.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        let name = name.trim_end_matches('.').to_ascii_lowercase();
        if name.is_empty() {
            return false;
        }
        let labels: Vec<&str> = name.split('.').rev().collect();
        if labels.iter().any(|label| label.is_empty()) {
            return false;
        }

        let mut node = &self.root;
        for (depth, label) in labels.iter().enumerate() {
            let Some(child) = node.children.get(*label) else {
                return false;
            };
            if child.endpoint {
                if let Some(next) = labels.get(depth + 1) {
                    if child.has_exception(next) {
                        return false;
                    }
                }
                return true;
            }
            node = child;
        }
        false
    }

    /// Enumerate one entry per endpoint node.
    ///
    /// Labels are reversed back to presentation order. Children are kept
    /// in an ordered map, so a single enumeration is deterministic;
    /// callers that need stable file output still sort the result.
    #[must_use]
    pub fn enumerate(&self) -> Vec<Entry> {
        let mut entries = Vec::with_capacity(self.endpoints);
        let mut path: Vec<&str> = Vec::new();
        Self::walk(&self.root, &mut path, &mut entries);
        entries
    }

    fn walk<'a>(node: &'a TrieNode, path: &mut Vec<&'a str>, out: &mut Vec<Entry>) {
        if node.endpoint {
            out.push(Entry {
                labels: path.iter().rev().map(|label| (*label).to_string()).collect(),
                exceptions: node.exceptions.clone(),
            });
        }
        for (label, child) in &node.children {
            path.push(label.as_str());
            Self::walk(child, path, out);
            path.pop();
        }
    }

    /// Number of endpoint nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.endpoints
    }

    /// Whether the trie holds no endpoints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints == 0
    }
}
