// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use axum::{routing::get, Router};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use warden::{
    api,
    constants::{
        DEFAULT_API_PORT, DEFAULT_BIND_ADDRESS, DEFAULT_BLOCKLIST_DIR, DEFAULT_CLIENTS_FILE,
        DEFAULT_METRICS_PORT, DEFAULT_WHITELIST_DIR, METRICS_SERVER_PATH, SHUTDOWN_DEADLINE_SECS,
        TOKIO_WORKER_THREADS,
    },
    engine::{EngineConfig, FilterEngine},
    metrics,
};

/// Per-client DNS filtering engine with a REST control plane.
#[derive(Debug, Parser)]
#[command(name = "warden", version, about)]
struct Cli {
    /// Path of the persisted client-policy document
    #[arg(long, default_value = DEFAULT_CLIENTS_FILE)]
    config: PathBuf,

    /// Directory holding blocklist files
    #[arg(long, default_value = DEFAULT_BLOCKLIST_DIR)]
    blocklist_dir: PathBuf,

    /// Directory holding whitelist files
    #[arg(long, default_value = DEFAULT_WHITELIST_DIR)]
    whitelist_dir: PathBuf,

    /// Bind address for both listeners
    #[arg(long, default_value = DEFAULT_BIND_ADDRESS)]
    bind_address: String,

    /// Control-plane API port
    #[arg(long, default_value_t = DEFAULT_API_PORT)]
    port: u16,

    /// Prometheus metrics port
    #[arg(long, default_value_t = DEFAULT_METRICS_PORT)]
    metrics_port: u16,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("warden")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(cli))
}

/// Initialize logging with custom format
///
/// Respects `RUST_LOG` environment variable if set, otherwise defaults to INFO level.
/// Respects `RUST_LOG_FORMAT` environment variable for output format (json or text).
fn initialize_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }

    info!("Starting warden DNS filtering engine");
    debug!("Logging initialized with file and line number tracking");
}

/// Start the Prometheus metrics HTTP server
///
/// Serves metrics on the configured port and path.
///
/// # Returns
/// A `JoinHandle` that can be used to monitor the server task
fn start_metrics_server(bind_address: String, port: u16) -> tokio::task::JoinHandle<()> {
    info!(
        bind_address = %bind_address,
        port = port,
        path = METRICS_SERVER_PATH,
        "Starting Prometheus metrics HTTP server"
    );

    tokio::spawn(async move {
        // Define the metrics endpoint handler
        async fn metrics_handler() -> String {
            match metrics::gather_metrics() {
                Ok(metrics_text) => metrics_text,
                Err(e) => {
                    error!("Failed to gather metrics: {}", e);
                    String::from("# Error gathering metrics\n")
                }
            }
        }

        // Build the router with the metrics endpoint
        let app = Router::new().route(METRICS_SERVER_PATH, get(metrics_handler));

        // Bind to the configured address and port
        let bind_addr = format!("{bind_address}:{port}");
        let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("Failed to bind metrics server to {bind_addr}: {e}");
                return;
            }
        };

        info!("Metrics server listening on http://{bind_addr}{METRICS_SERVER_PATH}");

        // Run the server
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {e}");
        }
    })
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() -> Result<()> {
    tokio::select! {
        // Monitor for SIGINT (Ctrl+C)
        result = tokio::signal::ctrl_c() => {
            info!("Received SIGINT (Ctrl+C), initiating graceful shutdown...");
            result.map_err(anyhow::Error::from)
        }

        // Monitor for SIGTERM (sent by the service manager on stop)
        result = async {
            #[cfg(unix)]
            {
                use tokio::signal::unix::{signal, SignalKind};
                let mut sigterm = signal(SignalKind::terminate())?;
                sigterm.recv().await;
                Ok::<(), anyhow::Error>(())
            }
            #[cfg(not(unix))]
            {
                // On non-Unix platforms, just wait forever
                std::future::pending::<()>().await;
                Ok::<(), anyhow::Error>(())
            }
        } => {
            info!("Received SIGTERM, initiating graceful shutdown...");
            result
        }
    }
}

async fn async_main(cli: Cli) -> Result<()> {
    initialize_logging();

    // The engine is constructed exactly once here and handed out via
    // shared ownership; there is no global instance to re-enter.
    let engine = FilterEngine::bootstrap(EngineConfig {
        clients_file: cli.config,
        blocklist_dir: cli.blocklist_dir,
        whitelist_dir: cli.whitelist_dir,
    })
    .await?;

    // Start the metrics HTTP server
    let _metrics_handle = start_metrics_server(cli.bind_address.clone(), cli.metrics_port);

    let api_addr: SocketAddr = format!("{}:{}", cli.bind_address, cli.port).parse()?;
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let mut server = tokio::spawn(api::serve(engine, api_addr, async move {
        let _ = shutdown_rx.wait_for(|stop| *stop).await;
    }));

    tokio::select! {
        // The server exiting on its own means a bind failure or a fatal
        // listener error.
        result = &mut server => {
            match result {
                Ok(Ok(())) => anyhow::bail!("control-plane server exited unexpectedly"),
                Ok(Err(e)) => {
                    error!("Control-plane server error: {e}");
                    return Err(e.into());
                }
                Err(e) => {
                    error!("Control-plane server task panicked: {e}");
                    return Err(e.into());
                }
            }
        }

        result = shutdown_signal() => {
            result?;

            // Stop accepting and drain in-flight requests within the deadline.
            let _ = shutdown_tx.send(true);
            match tokio::time::timeout(Duration::from_secs(SHUTDOWN_DEADLINE_SECS), &mut server).await {
                Ok(Ok(Ok(()))) => info!("Graceful shutdown completed successfully"),
                Ok(Ok(Err(e))) => error!("Control-plane server error during shutdown: {e}"),
                Ok(Err(e)) => error!("Control-plane server task panicked: {e}"),
                Err(_) => {
                    warn!(
                        "Shutdown deadline of {SHUTDOWN_DEADLINE_SECS}s elapsed, abandoning in-flight requests"
                    );
                    server.abort();
                }
            }
        }
    }

    Ok(())
}

// Tests are in main_tests.rs
#[cfg(test)]
mod main_tests;
