// Sakura Cloud Exporter - Prometheus exporter for Sakura Cloud resources
//
// Every scrape of the metrics endpoint lists the account's resources through
// the Sakura Cloud API and renders their state and recent activity as
// Prometheus gauges.
//
// # Features
// - Servers, databases, load balancers, VPC routers, mobile gateways, NFS
// - SIM, ProxyLB, internet routers, auto-backups, ESME
// - Coupons, bills, zones, web accelerator sites
// - Per-collector error counter and structured logs
// - Systemd integration for production deployment
//
// # Usage
// sakuracloud-exporter --token <token> --secret <secret>
//
// Example:
// SAKURACLOUD_ACCESS_TOKEN=... SAKURACLOUD_ACCESS_TOKEN_SECRET=... sakuracloud-exporter --zones is1a,tk1a

use std::env;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// Module declarations
mod config;
mod errors;
mod labels;
mod metrics;
mod platform;
mod registry;
mod server;
mod sink;

use config::ExporterConfig;
use errors::ErrorCounter;
use metrics::create_all_collectors;
use platform::SakuraCloudClient;
use registry::ExporterRegistry;
use server::ServerState;

/// Application entry point
///
/// This function:
/// 1. Parses and validates the configuration
/// 2. Initializes logging
/// 3. Builds the API client and the enabled collectors
/// 4. Serves the metrics endpoint until Ctrl+C / SIGTERM
#[tokio::main]
async fn main() -> Result<()> {
    let config = ExporterConfig::parse();

    init_logging(config.debug);

    info!("=== Sakura Cloud Exporter Starting ===");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    config.validate().context("Invalid configuration")?;
    config.log_configuration();

    let client = SakuraCloudClient::new(config.client_options())
        .context("Failed to create Sakura Cloud API client")?;
    let client = Arc::new(client);

    let errors = ErrorCounter::new().context("Failed to create error counter")?;
    let collectors = create_all_collectors(&config, client, &errors)
        .context("Failed to create collectors")?;
    info!("Created {} collector(s)", collectors.len());

    let registry = ExporterRegistry::new(collectors, errors, config.max_concurrency())
        .context("Failed to register collectors")?;

    info!("=== Sakura Cloud Exporter Started Successfully ===");
    info!("Press Ctrl+C to stop");

    server::serve(
        config.webaddr,
        ServerState::new(Arc::new(registry), &config.webpath),
    )
    .await
    .with_context(|| format!("Failed to serve metrics on {}", config.webaddr))?;

    info!("=== Sakura Cloud Exporter Stopped ===");
    Ok(())
}

/// Initializes the logging subsystem
///
/// Sets up structured logging with:
/// - Timestamp for each log entry
/// - Log level (INFO, WARN, ERROR, etc.)
/// - Target module name
/// - Colored output when running in terminal
/// - JSON output when running as systemd service
///
/// # Log Levels
/// Default: INFO, or DEBUG with `--debug`
/// Can be overridden with RUST_LOG environment variable
///
/// # Examples
/// ```bash
/// RUST_LOG=debug sakuracloud-exporter ...  # Enable debug logging
/// RUST_LOG=warn sakuracloud-exporter ...   # Only warnings and errors
/// ```
fn init_logging(debug: bool) {
    // Systemd sets INVOCATION_ID environment variable
    let is_systemd = env::var("INVOCATION_ID").is_ok();

    let default_level = if debug { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if is_systemd {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_ansi(true),
            )
            .init();
    }
}
