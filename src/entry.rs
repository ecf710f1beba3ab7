// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! List entry syntax.
//!
//! One entry per line in a list file:
//!
//! ```text
//! <domain> [ !<exlabel> ( [, ] !<exlabel> )* ]
//! ```
//!
//! `<domain>` is a dot-separated sequence of labels. Each `!<exlabel>` names
//! a single label that, when it is the first subdomain beneath the domain,
//! negates the match. Lines starting with `#` and blank lines are comments.
//! Whitespace around separators is insignificant and labels are case-folded
//! on parse.

use crate::errors::EngineError;
use std::fmt;

/// A parsed list entry: a domain plus its exception labels.
///
/// Labels are stored lower-cased in presentation order (`mail.example.com`
/// is `["mail", "example", "com"]`). Exception labels are kept sorted so
/// entry equality and membership checks are order-independent.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Entry {
    /// Domain labels in presentation order, lower-cased, never empty
    pub labels: Vec<String>,
    /// Exception labels, lower-cased, sorted, deduplicated
    pub exceptions: Vec<String>,
}

impl Entry {
    /// Parse a single non-comment entry.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::BadEntry`] when the domain is empty, a label
    /// is empty (leading/trailing/doubled dots), an exception token lacks
    /// the `!` prefix, or an exception label contains a dot.
    pub fn parse(text: &str) -> Result<Self, EngineError> {
        let bad = |reason: &str| EngineError::BadEntry {
            entry: text.trim().to_string(),
            reason: reason.to_string(),
        };

        // Commas between exception tokens are optional separators.
        let normalized = text.replace(',', " ");
        let mut tokens = normalized.split_whitespace();

        let domain = tokens.next().ok_or_else(|| bad("empty entry"))?;
        if domain.starts_with('!') {
            return Err(bad("entry must start with a domain, not an exception"));
        }

        let mut labels = Vec::new();
        for label in domain.split('.') {
            if label.is_empty() {
                return Err(bad("empty label in domain"));
            }
            labels.push(label.to_ascii_lowercase());
        }

        let mut exceptions: Vec<String> = Vec::new();
        for token in tokens {
            let Some(label) = token.strip_prefix('!') else {
                return Err(bad("exception labels must be prefixed with '!'"));
            };
            if label.is_empty() {
                return Err(bad("empty exception label"));
            }
            if label.contains('.') {
                return Err(bad("exception must be a single label, not a domain"));
            }
            let label = label.to_ascii_lowercase();
            if let Err(pos) = exceptions.binary_search(&label) {
                exceptions.insert(pos, label);
            }
        }

        Ok(Self { labels, exceptions })
    }

    /// Parse one line of a list file or request payload.
    ///
    /// Returns `Ok(None)` for blank lines and `#` comments; trailing
    /// whitespace is trimmed before inspection.
    ///
    /// # Errors
    ///
    /// Propagates [`EngineError::BadEntry`] from [`Entry::parse`].
    pub fn parse_line(line: &str) -> Result<Option<Self>, EngineError> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(None);
        }
        Self::parse(trimmed).map(Some)
    }

    /// The domain in presentation order, without exceptions.
    #[must_use]
    pub fn domain(&self) -> String {
        self.labels.join(".")
    }

    /// Whether `other` names the same base domain, exceptions aside.
    ///
    /// Removal requests match on the base domain only; an entry with the
    /// same domain but different exceptions is still removed.
    #[must_use]
    pub fn same_domain(&self, other: &Self) -> bool {
        self.labels == other.labels
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.domain())?;
        for exception in &self.exceptions {
            write!(f, " !{exception}")?;
        }
        Ok(())
    }
}
