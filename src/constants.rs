// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the warden filtering engine.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// Default Paths & Ports
// ============================================================================

/// Default path of the persisted client-policy document
pub const DEFAULT_CLIENTS_FILE: &str = "/clients.json";

/// Default directory holding blocklist files (one file per list)
pub const DEFAULT_BLOCKLIST_DIR: &str = "/blocklists";

/// Default directory holding whitelist files (one file per list)
pub const DEFAULT_WHITELIST_DIR: &str = "/whitelists";

/// Default control-plane API port
pub const DEFAULT_API_PORT: u16 = 8099;

/// Default bind address for the control-plane and metrics listeners
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

/// Default Prometheus metrics port
pub const DEFAULT_METRICS_PORT: u16 = 9155;

/// Path of the Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

// ============================================================================
// Wire Names
// ============================================================================

/// URL segment and JSON value naming the block kind
pub const KIND_BLOCKLIST: &str = "blocklist";

/// URL segment and JSON value naming the allow kind
pub const KIND_WHITELIST: &str = "whitelist";

// ============================================================================
// List File Format
// ============================================================================

/// First header line written to every generated list file
pub const LIST_FILE_HEADER: &str = "# Automatically generated list";

/// Prefix of the second header line; the RFC-3339 timestamp is appended
pub const LIST_FILE_UPDATE_PREFIX: &str = "# Last update: ";

// ============================================================================
// Timeouts
// ============================================================================

/// Wall-clock budget for a single control-plane request
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Deadline for draining in-flight requests during graceful shutdown
pub const SHUTDOWN_DEADLINE_SECS: u64 = 10;

// ============================================================================
// Tokio Runtime Constants
// ============================================================================

/// Number of tokio worker threads
pub const TOKIO_WORKER_THREADS: usize = 4;
