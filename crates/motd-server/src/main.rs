//! motd server binary
//!
//! Configuration comes from `MOTD_*` environment variables; the flags below
//! override the listener address and the cache directory.

use clap::Parser;
use motd_server::{App, MotdConfig, Result};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "motd-server")]
#[command(version)]
#[command(about = "Serve a random cached image or comic to every TCP client")]
struct Args {
    /// Address to listen on (overrides MOTD_LISTEN_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides MOTD_LISTEN_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Cache directory (overrides MOTD_CACHE_DIR)
    #[arg(long)]
    cache_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let env_filter = EnvFilter::from_default_env()
        .add_directive("motd_server=info".parse()?)
        .add_directive("motd_cache=info".parse()?)
        .add_directive("motd_providers=info".parse()?);

    // Use JSON format for Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    };

    let mut config = MotdConfig::from_env()?;
    if let Some(host) = args.host {
        config.listen_host = host;
    }
    if let Some(port) = args.port {
        config.listen_port = port;
    }
    if let Some(cache_dir) = args.cache_dir {
        config.cache_dir = cache_dir;
    }

    info!(version = env!("CARGO_PKG_VERSION"), "Starting motd server");
    info!("Cache dir: {:?}", config.cache_dir);
    info!("Max cached files: {}", config.cache_max_files);
    info!(
        "Download every {}s, clean up every {}s",
        config.download_interval.as_secs(),
        config.cleanup_interval.as_secs()
    );

    let app = App::from_config(config).await?;
    app.start().await?.run_until(shutdown_signal()).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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
}
