//! tubemap-server - Graph region extraction service
//!
//! Serves the sequence tube map front end: region extraction, index
//! catalog and path name listing, all backed by the `vg` toolkit.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tubemap_common::config::TomlConfig;
use tubemap_server::{build_router, AppState};

/// Command-line arguments for tubemap-server
///
/// Every flag overrides the matching config file setting.
#[derive(Parser, Debug)]
#[command(name = "tubemap-server")]
#[command(about = "Graph region extraction service for the sequence tube map")]
#[command(version)]
struct Args {
    /// TOML config file
    #[arg(short, long, env = "TUBEMAP_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "TUBEMAP_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(long, env = "TUBEMAP_BIND_ADDRESS")]
    bind_address: Option<String>,

    /// Path to the vg binary
    #[arg(long, env = "TUBEMAP_VG_PATH")]
    vg_path: Option<PathBuf>,

    /// Externally mounted reference-data directory
    #[arg(long, env = "TUBEMAP_MOUNTED_DATA_DIR")]
    mounted_data_dir: Option<PathBuf>,

    /// Internal reference-data directory
    #[arg(long, env = "TUBEMAP_INTERNAL_DATA_DIR")]
    internal_data_dir: Option<PathBuf>,

    /// Root of the per-request working directories
    #[arg(long, env = "TUBEMAP_WORK_DIR")]
    work_dir: Option<PathBuf>,

    /// Timeout for each vg invocation, in seconds
    #[arg(long, env = "TUBEMAP_TOOL_TIMEOUT_SECS")]
    tool_timeout_secs: Option<u64>,
}

impl Args {
    /// Apply command-line and environment overrides on top of the file config
    fn apply(self, mut config: TomlConfig) -> TomlConfig {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(bind_address) = self.bind_address {
            config.bind_address = bind_address;
        }
        if let Some(vg_path) = self.vg_path {
            config.vg_path = vg_path;
        }
        if let Some(dir) = self.mounted_data_dir {
            config.mounted_data_dir = dir;
        }
        if let Some(dir) = self.internal_data_dir {
            config.internal_data_dir = dir;
        }
        if let Some(dir) = self.work_dir {
            config.work_dir = dir;
        }
        if let Some(secs) = self.tool_timeout_secs {
            config.tool_timeout_secs = secs;
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let file_config = TomlConfig::load(args.config.as_deref());
    let log_level = file_config
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());

    // Initialize tracing; RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("tubemap_server={0},tubemap_common={0},tower_http=info", log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting tubemap-server v{}", env!("CARGO_PKG_VERSION"));

    let config = args.apply(file_config.context("Failed to load configuration")?);
    config.validate().context("Invalid configuration")?;

    info!("vg binary: {}", config.vg_path.display());
    info!("Mounted data: {}", config.mounted_data_dir.display());
    info!("Internal data: {}", config.internal_data_dir.display());
    info!("Work directory: {}", config.work_dir.display());
    info!(
        "Tool timeout: {}s, max concurrent jobs: {}",
        config.tool_timeout_secs, config.max_concurrent_jobs
    );

    tokio::fs::create_dir_all(&config.work_dir)
        .await
        .with_context(|| format!("Failed to create work directory {}", config.work_dir.display()))?;

    let state = AppState::from_config(&config);
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port)
        .parse()
        .context("Invalid bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
