// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `main.rs` - CLI defaults, signal handling and graceful shutdown

#[cfg(test)]
mod tests {
    use clap::Parser;
    use std::time::Duration as StdDuration;
    use tokio::time::timeout;

    #[test]
    fn test_cli_defaults_match_contract() {
        let cli = super::super::Cli::parse_from(["warden"]);
        assert_eq!(cli.config.to_str(), Some("/clients.json"));
        assert_eq!(cli.blocklist_dir.to_str(), Some("/blocklists"));
        assert_eq!(cli.whitelist_dir.to_str(), Some("/whitelists"));
        assert_eq!(cli.port, 8099);
    }

    #[test]
    fn test_cli_overrides() {
        let cli = super::super::Cli::parse_from([
            "warden",
            "--config",
            "/tmp/clients.json",
            "--port",
            "9000",
        ]);
        assert_eq!(cli.config.to_str(), Some("/tmp/clients.json"));
        assert_eq!(cli.port, 9000);
    }

    /// Test that SIGTERM signal handler can be created on Unix platforms
    #[tokio::test]
    #[cfg(unix)]
    async fn test_sigterm_signal_handler_creation() {
        use tokio::signal::unix::{signal, SignalKind};

        // This tests that we can successfully create a SIGTERM signal handler
        // The actual signal delivery is tested manually or in integration tests
        let result = signal(SignalKind::terminate());
        assert!(
            result.is_ok(),
            "Should be able to create SIGTERM signal handler"
        );
    }

    /// Test that SIGINT (Ctrl+C) signal handler can be set up
    #[tokio::test]
    async fn test_sigint_handler_exists() {
        // We can't actually trigger Ctrl+C in a test, but we can verify
        // the handler setup doesn't panic
        let ctrl_c_future = tokio::signal::ctrl_c();

        // Use a timeout to ensure the future is valid but doesn't block forever
        let result = timeout(StdDuration::from_millis(100), ctrl_c_future).await;

        // We expect a timeout error since we're not actually sending SIGINT
        assert!(
            result.is_err(),
            "ctrl_c() future should timeout when no signal is sent"
        );
    }

    /// Test the shutdown-deadline pattern used by the main loop
    #[tokio::test]
    async fn test_shutdown_deadline_abandons_slow_drain() {
        let slow_drain = tokio::spawn(async {
            tokio::time::sleep(StdDuration::from_secs(60)).await;
        });

        let result = timeout(StdDuration::from_millis(50), slow_drain).await;
        assert!(result.is_err(), "deadline should elapse before the drain");
    }
}
