use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bucketgate::config::BucketgateConfig;
use bucketgate::http::{AppState, HttpServer};
use bucketgate::ratelimit::RateLimiter;

/// Per-client token bucket admission control in front of an HTTP API.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long, env = "BUCKETGATE_CONFIG")]
    config: Option<PathBuf>,

    /// HTTP listen address, overriding the configuration
    #[arg(long)]
    http_addr: Option<SocketAddr>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if args.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(true)
            .init();
    }

    info!("Starting Bucketgate admission control service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = BucketgateConfig::load(args.config.as_deref())?;
    let port = std::env::var("PORT").ok();
    config.apply_listen_overrides(args.http_addr, port.as_deref())?;

    let bucket_config = config.rate_limiting.bucket_config()?;
    info!(
        http_addr = %config.server.http_addr,
        capacity = bucket_config.capacity,
        refill_rate = bucket_config.refill_rate,
        refill_interval_ms = bucket_config.refill_interval.as_millis() as u64,
        trust_proxy = config.server.trust_proxy,
        "Configuration loaded"
    );

    let rate_limiter = Arc::new(RateLimiter::with_config(bucket_config));
    let mut state = AppState::new(rate_limiter, config.server.trust_proxy);
    if let Some(dir) = config.server.static_dir.clone() {
        info!(dir = %dir.display(), "Serving static assets");
        state = state.with_static_dir(dir);
    }

    let server = HttpServer::bind(config.server.http_addr, state).await?;
    info!("Data endpoint: http://{}/api/data", server.local_addr()?);
    info!("Metrics endpoint: http://{}/api/metrics", server.local_addr()?);

    // Run the server with graceful shutdown on Ctrl+C
    server.serve_with_shutdown(shutdown_signal()).await?;

    info!("Bucketgate admission control service stopped");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
