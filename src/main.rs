//! Greeter web app entry point.
//!
//! Initializes tracing, loads the optional TOML configuration, snapshots the
//! upstream service variables from the environment, builds the shared HTTP
//! client, and serves the router until a shutdown signal arrives.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use greeter_webapp::config::{AppConfig, ServiceSettings, DEFAULT_LOG_FILTER};
use greeter_webapp::{create_router, http::start_server, AppState};

/// Greeter: joins the greeting and name services into one message
#[derive(Parser, Debug)]
#[command(name = "greeter-webapp", version, about)]
struct Args {
    /// Path to an optional TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Log level filter (e.g., "greeter_webapp=debug,tower_http=info")
    #[arg(short, long)]
    log_level: Option<String>,

    /// Listen host (overrides http.host)
    #[arg(long)]
    host: Option<String>,

    /// Listen port (overrides http.port)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(host) = args.host {
        config.http.host = host;
    }
    if let Some(port) = args.port {
        config.http.port = port;
    }

    // Initialize tracing with priority: CLI > env > default
    let log_filter = args
        .log_level
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

    let registry =
        tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::new(&log_filter));
    if config.logging.is_json() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!(config = ?args.config, "Loaded configuration");

    let services = ServiceSettings::from_env();
    tracing::info!(
        greeting_host = ?services.greeting.host,
        name_host = ?services.name.host,
        tracker_configured = services.tracker_url.is_some(),
        timeout_seconds = config.upstream.timeout_seconds,
        "Upstream services configured"
    );

    let state = AppState::new(&config.upstream, services)?;
    let app = create_router(state);

    start_server(app, &config.http).await?;

    Ok(())
}
