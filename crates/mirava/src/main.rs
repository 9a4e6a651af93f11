//! Mirava - failover proxy for container registry and package index mirrors

use anyhow::Result;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;

use config::{Config, LoggingConfig};
use mirava_api::{create_router, AppState};
use mirava_core::{spawn_recovery_task, FailoverRouter, MirrorRegistry};
use mirava_proxy::MirrorClient;

/// Mirava - failover proxy for registry and package index mirrors
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    /// Bind address
    #[arg(long, env = "MIRAVA_BIND")]
    bind: Option<String>,

    /// Port
    #[arg(short, long, env = "MIRAVA_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration
    let config = Config::load(&args.config)?;

    // Initialize logging
    init_logging(&config.logging);

    info!("Starting Mirava v{}", env!("CARGO_PKG_VERSION"));

    // Install the Prometheus recorder before anything records a metric
    let metrics_handle = if config.metrics.enabled {
        Some(Arc::new(PrometheusBuilder::new().install_recorder()?))
    } else {
        None
    };

    // Shared outbound client
    let client = Arc::new(MirrorClient::new(config.client.to_client_config())?);
    info!("HTTP client initialized");

    // Mirror managers, one per upstream type
    let registry = Arc::new(MirrorRegistry::from_config(
        &config.mirror_types,
        config.health.max_failures,
    ));

    let recovery = (config.health.recovery_interval_secs > 0).then(|| {
        spawn_recovery_task(registry.clone(), config.health.recovery_interval_secs)
    });

    let router = Arc::new(FailoverRouter::new(client));
    let state = AppState::new(registry, router);

    // Create router
    let app = create_router(state, metrics_handle).layer(TraceLayer::new_for_http());

    // Determine bind address
    let bind_addr = args.bind.unwrap_or(config.server.bind_address);
    let port = args.port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", bind_addr, port).parse()?;

    info!("Listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = recovery {
        handle.abort();
    }

    info!("Server stopped");
    Ok(())
}

/// Initialize logging
fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.format.eq_ignore_ascii_case("json") {
        subscriber.with(fmt::layer().json()).init();
    } else {
        subscriber.with(fmt::layer()).init();
    }
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
