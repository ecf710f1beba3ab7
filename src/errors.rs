// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for the warden filtering engine.
//!
//! This module provides the engine-wide error enum surfaced by the list
//! store, the client registry and the policy engine. The control-plane
//! layer maps each variant onto its HTTP status code and the
//! `{"error": ...}` response envelope.

use thiserror::Error;

/// Errors surfaced by engine operations.
///
/// Every fallible operation of the list store, client registry and policy
/// engine returns one of these variants. Conditions the engine recovers
/// from locally (a failed file unlink after an in-memory removal, a policy
/// referencing an unloaded list at evaluation time) are logged instead of
/// surfaced.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A list kind outside `blocklist` / `whitelist` was named.
    ///
    /// Returned when a URL segment or JSON field carries an unknown kind
    /// string. The wire names are the only accepted spellings.
    #[error("unknown list kind '{0}'")]
    BadKind(String),

    /// A list entry failed to parse.
    ///
    /// Covers empty labels, dotted exception labels and malformed
    /// exception syntax. The offending entry is echoed back verbatim.
    #[error("invalid entry '{entry}': {reason}")]
    BadEntry {
        /// The entry text as submitted
        entry: String,
        /// Explanation of what is invalid
        reason: String,
    },

    /// A request or document body was not valid JSON for the target type.
    #[error("invalid JSON: {0}")]
    BadJson(String),

    /// The named resource does not exist.
    ///
    /// Used for both lists (within their kind) and clients.
    #[error("{0} not found")]
    NotFound(String),

    /// A create targeted a name that is already taken.
    ///
    /// File presence on disk counts as taken even when the list is not
    /// currently loaded, so an unreferenced list file is never silently
    /// overwritten.
    #[error("{0} already exists")]
    AlreadyExists(String),

    /// A client policy referenced a list that does not exist.
    #[error("referenced {kind} '{name}' does not exist")]
    ReferencedListMissing {
        /// Wire name of the kind the reference was checked against
        kind: String,
        /// The referenced list name
        name: String,
    },

    /// The request exceeded its wall-clock budget.
    #[error("request timed out")]
    Timeout,

    /// A filesystem or serialization failure reached the caller.
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Short machine-readable reason code for this error.
    ///
    /// Used in structured log fields and metrics labels.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::BadKind(_) => "BadKind",
            Self::BadEntry { .. } => "BadEntry",
            Self::BadJson(_) => "BadJSON",
            Self::NotFound(_) => "NotFound",
            Self::AlreadyExists(_) => "AlreadyExists",
            Self::ReferencedListMissing { .. } => "ReferencedListMissing",
            Self::Timeout => "Timeout",
            Self::Internal(_) => "Internal",
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadJson(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_codes_are_stable() {
        assert_eq!(EngineError::BadKind("x".into()).reason(), "BadKind");
        assert_eq!(EngineError::Timeout.reason(), "Timeout");
        assert_eq!(
            EngineError::ReferencedListMissing {
                kind: "whitelist".into(),
                name: "ok".into(),
            }
            .reason(),
            "ReferencedListMissing"
        );
    }

    #[test]
    fn test_already_exists_message_contains_phrase() {
        // The control plane promises conflict messages containing "already exists".
        let err = EngineError::AlreadyExists("blocklist 'ads'".into());
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_io_error_maps_to_internal() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = EngineError::from(io);
        assert_eq!(err.reason(), "Internal");
        assert!(err.to_string().contains("denied"));
    }
}
