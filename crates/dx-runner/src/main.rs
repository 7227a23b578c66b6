//! # dx-runner
//!
//! Serves DX cluster spots from HamQTH and DXSpider over HTTP.
//!
//! # Usage
//!
//! ```bash
//! dx-runner config.json --log-level info
//! dx-runner --bind 127.0.0.1:8080
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use dx_core::config::AppConfig;
use dx_feed::registry::SpotServices;
use dx_runner::{AppState, build_router};
use tokio::signal;
use tracing::info;

/// DX spot aggregator.
#[derive(Parser)]
#[command(name = "dx-runner", version, about = "DX cluster spot aggregator")]
struct Cli {
    /// Configuration file path (JSON). Defaults apply when omitted.
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Optional log directory for file output.
    #[arg(long)]
    log_dir: Option<String>,

    /// Listen address, overrides `server.bind_addr`.
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load configuration
    let mut config = match &cli.config {
        Some(path) => dx_core::config::load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.server.bind_addr = bind;
    }

    // 2. Initialize logging
    let log_dir = cli.log_dir.as_deref().or(config.logging.log_path.as_deref());
    let module_name = config.logging.module_name.as_deref().unwrap_or("dx-runner");
    let _log_guard = dx_core::logging::init_logging(&cli.log_level, log_dir, module_name);

    info!(
        "dx-runner starting, config={}, log_level={}",
        cli.config.as_ref().map_or_else(|| "<defaults>".into(), |p| p.display().to_string()),
        cli.log_level,
    );

    // 3. Build services and router
    let services = SpotServices::from_config(&config)?;
    let app = build_router(AppState::new(services));

    // 4. Serve until Ctrl+C / SIGTERM
    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind_addr))?;
    info!("listening on {}", config.server.bind_addr);

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await.context("server error")?;

    info!("server stopped, goodbye");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received terminate signal, shutting down"),
    }
}
