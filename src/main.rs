//! thumbd - HTTP image-thumbnailing proxy daemon.

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use clap::Parser;
use std::time::Duration;
use thumbd::config::ThumbdConfig;
use thumbd::service::{router, AppState};
use tokio::net::TcpListener;
use tracing::{error, info};

/// Command-line configuration. Flags take precedence over the `THUMBD_*`
/// environment variables read by [`ThumbdConfig::from_env`].
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Config {
    /// Port to listen on
    #[arg(short, long, env = "THUMBD_PORT", default_value = "8000")]
    port: u16,

    /// Bind address
    #[arg(short, long, env = "THUMBD_BIND", default_value = "127.0.0.1")]
    bind: String,

    /// Timeout for upstream HTTP requests, in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Face API subscription key; face lookups are only useful with one
    #[arg(long)]
    key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Config::parse();

    let mut config = ThumbdConfig::from_env();
    if let Some(timeout) = cli.timeout {
        config.upstream_timeout = Duration::from_secs(timeout);
    }
    if let Some(key) = cli.key {
        config.face_api_key = key;
    }

    let state = AppState::new(&config)?;

    let addr = format!("{}:{}", cli.bind, cli.port);
    let listener = TcpListener::bind(&addr).await?;

    info!(
        addr = %addr,
        upstream_timeout_secs = config.upstream_timeout.as_secs(),
        face_api = %config.face_api_url,
        version = env!("CARGO_PKG_VERSION"),
        "thumbd listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("thumbd shut down cleanly");
    Ok(())
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for SIGINT");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => error!(error = %e, "failed to listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received SIGINT, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
    }
}
