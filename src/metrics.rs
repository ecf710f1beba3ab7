// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the warden filtering engine.
//!
//! All metrics live under the `warden_` namespace and are registered in
//! [`METRICS_REGISTRY`], exposed by the dedicated metrics listener.
//!
//! # Metrics Categories
//!
//! - **Decision Metrics** - DNS policy evaluations by outcome
//! - **Control-Plane Metrics** - REST requests by method and status

use prometheus::{CounterVec, Encoder, Opts, Registry, TextEncoder};
use std::sync::LazyLock;

/// Namespace prefix for all warden metrics
const METRICS_NAMESPACE: &str = "warden";

/// Global Prometheus metrics registry
///
/// All metrics are registered in this registry and exposed via the
/// `/metrics` endpoint of the metrics listener.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

/// Total number of policy decisions by outcome
///
/// Labels:
/// - `outcome`: `allow` or `deny`
pub static DECISIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_decisions_total"),
        "Total number of policy decisions by outcome",
    );
    let counter = CounterVec::new(opts, &["outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Total number of control-plane requests by method and status code
///
/// Labels:
/// - `method`: HTTP method
/// - `status`: numeric status code
pub static API_REQUESTS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_api_requests_total"),
        "Total number of control-plane requests by method and status",
    );
    let counter = CounterVec::new(opts, &["method", "status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Record one policy decision.
pub fn record_decision(allowed: bool) {
    let outcome = if allowed { "allow" } else { "deny" };
    DECISIONS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Record one control-plane request.
pub fn record_api_request(method: &str, status: u16) {
    API_REQUESTS_TOTAL
        .with_label_values(&[method, &status.to_string()])
        .inc();
}

/// Gather all registered metrics in the Prometheus text format.
///
/// # Errors
///
/// Returns a [`prometheus::Error`] when encoding fails.
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_decision_both_outcomes() {
        record_decision(true);
        record_decision(false);
        let allow = DECISIONS_TOTAL.with_label_values(&["allow"]).get();
        let deny = DECISIONS_TOTAL.with_label_values(&["deny"]).get();
        assert!(allow >= 1.0);
        assert!(deny >= 1.0);
    }

    #[test]
    fn test_gather_metrics_includes_namespace() {
        record_api_request("GET", 200);
        let text = gather_metrics().unwrap();
        assert!(text.contains("warden_api_requests_total"));
    }
}
