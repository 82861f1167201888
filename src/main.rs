//! backend-shim (v1)
//!
//! Launches one local backend process and forwards every HTTP request to it.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────┐
//!                      │                 BACKEND SHIM                 │
//!                      │                                              │
//!   Client Request     │  ┌─────────┐    ┌───────────┐                │
//!   ───────────────────┼─▶│  http   │───▶│ forwarder │────────────────┼──┐
//!                      │  │ server  │    │ (timeout) │                │  │ loopback
//!                      │  └─────────┘    └─────┬─────┘                │  │ HTTP/1.1
//!   Client Response    │       ▲               │ relay / JSON error   │  │
//!   ◀──────────────────┼───────┴───────────────┘                      │  ▼
//!                      │                                    ┌───────────────┐
//!                      │  ┌────────────┐   spawn / killpg   │    backend    │
//!                      │  │ supervisor │───────────────────▶│ process group │
//!                      │  └────────────┘◀── stdout/stderr ──└───────────────┘
//!                      │                                              │
//!                      │  config · lifecycle · observability          │
//!                      └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use backend_shim::config::{load_config, ShimConfig};
use backend_shim::observability::logging;
use backend_shim::lifecycle::stop_backend;
use backend_shim::{Backend, HttpServer, Shutdown, Supervisor};

#[derive(Parser)]
#[command(name = "backend-shim")]
#[command(about = "Run a backend process and proxy HTTP requests to it", long_about = None)]
struct Cli {
    /// TOML configuration file; built-in defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ShimConfig::default(),
    };

    logging::init(&config.observability)?;

    if cli.check {
        tracing::info!("Configuration OK");
        return Ok(());
    }

    tracing::info!("backend-shim v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        backend_port = config.backend.port,
        timeout_secs = config.forwarder.timeout_secs,
        "Configuration loaded"
    );

    let supervisor = Supervisor::new(config.backend.clone());
    if let Err(e) = supervisor.start() {
        tracing::error!(error = %e, "Backend failed to start; requests will fail until restart");
    }
    let backend: Arc<dyn Backend> = Arc::new(supervisor);

    let listener = match TcpListener::bind(&config.listener.bind_address).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, address = %config.listener.bind_address, "Failed to bind listener");
            stop_backend(backend).await;
            return Err(e.into());
        }
    };

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    shutdown.trigger_on_signal();

    let server = HttpServer::new(&config, backend.as_ref());
    let served = server.run(listener, server_shutdown).await;

    stop_backend(backend).await;

    served?;
    tracing::info!("Shutdown complete");
    Ok(())
}
