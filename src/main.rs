//! Device Gateway - Main Entry Point
//!
//! Loads the YAML configuration, builds the device registry once and serves
//! the REST surface until Ctrl-C.

use anyhow::Context;
use clap::Parser;
use device_gateway::{
    client::SignedTransport,
    config::GatewayConfig,
    devices::DeviceRegistry,
    http_transport::HttpTransportServer,
    logging::{init_logging, LogConfig},
    server::Dispatcher,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};

/// Device Gateway Configuration
#[derive(Parser, Debug)]
#[command(name = "device-gateway")]
#[command(about = "REST gateway for signed vendor device protocols")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, env = "GATEWAY_CONFIG", default_value = "gateway.yaml")]
    config: PathBuf,

    /// Override the bind address from the configuration file
    #[arg(long, env = "GATEWAY_BIND")]
    bind: Option<String>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = GatewayConfig::from_file(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    let mut log_config = LogConfig::from_env().merge_file_config(&config.logging);
    if cli.debug {
        log_config.level = Level::DEBUG;
    }
    init_logging(log_config).map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "Starting device gateway"
    );

    let transport = Arc::new(SignedTransport::new()?);
    let registry = DeviceRegistry::from_config(&config, transport)?;
    let dispatcher = Dispatcher::new(Arc::new(registry));

    let bind = cli.bind.unwrap_or_else(|| config.server.bind.clone());
    HttpTransportServer::new(dispatcher, bind).start().await?;

    Ok(())
}
