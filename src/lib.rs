// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # Warden - Per-Client DNS Filtering Engine
//!
//! Warden is a per-client DNS filtering engine embedded as a plugin in a
//! recursive DNS server. Every inbound query is inspected against the
//! querying client's policy; matching names are answered with an NXDOMAIN
//! response, all others are forwarded down the plugin chain. Policy is
//! managed through a REST control plane over three resource kinds:
//! blocklists, whitelists and clients.
//!
//! ## Overview
//!
//! The heart of the crate is a compressed reverse-label trie with
//! per-endpoint subdomain exceptions. Each named list projects into one
//! trie; a client policy composes several tries under its mode; a single
//! reader/writer lock keeps the in-memory state consistent with the list
//! files and the client document across the concurrent DNS (read) and
//! REST (write) paths.
//!
//! ## Modules
//!
//! - [`trie`] - Reverse-label domain trie with exception semantics
//! - [`entry`] - List entry syntax (parse and format)
//! - [`lists`] - Named lists backed by flat files, projected into tries
//! - [`clients`] - Per-client policies persisted as one JSON document
//! - [`engine`] - The process-wide engine: evaluator, mutations, lifecycle
//! - [`api`] - REST control plane
//! - [`dns`] - DNS handler shim (NXDOMAIN synthesis / pass-through)
//! - [`metrics`] - Prometheus metrics
//!
//! ## Example
//!
//! ```rust,no_run
//! use warden::engine::{EngineConfig, FilterEngine};
//!
//! # async fn example() -> Result<(), warden::errors::EngineError> {
//! let engine = FilterEngine::bootstrap(EngineConfig::default()).await?;
//!
//! let decision = engine.decide("10.0.0.1", "tracker.example.com").await;
//! if !decision.is_allowed() {
//!     // synthesize NXDOMAIN
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod clients;
pub mod constants;
pub mod dns;
pub mod engine;
pub mod entry;
pub mod errors;
pub mod lists;
pub mod metrics;
pub mod trie;

#[cfg(test)]
mod engine_tests;
