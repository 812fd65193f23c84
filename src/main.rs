//! Firmware gateway.
//!
//! Serves the latest firmware record per device class and records device
//! installation acknowledgments on the ledger.
//!
//! ```text
//!     Device                 ┌──────────────────────────────────────────┐
//!     ──GET /firmware/latest─┼─▶ http ──▶ registry.getLatest ──(call)──┼──▶ Ledger
//!     ──POST /ack────────────┼─▶ http ──▶ registry.ack ──▶ ledger      │
//!                            │          client (serialized submit) ────┼──▶ endpoint
//!                            │                                          │
//!                            │  config · observability · lifecycle      │
//!                            └──────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use firmware_ledger::config::load_or_default;
use firmware_ledger::http::GatewayServer;
use firmware_ledger::lifecycle::{signals, startup, Shutdown};
use firmware_ledger::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "firmware-gateway")]
#[command(about = "Device-facing firmware gateway backed by the firmware registry", long_about = None)]
struct Cli {
    /// Path to the TOML config file; defaults apply when it is missing.
    #[arg(short, long, default_value = "firmware-ledger.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_or_default(&cli.config)?;

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "firmware-gateway starting");

    tracing::info!(
        bind_address = %config.gateway.bind_address,
        rpc_url = %config.ledger.rpc_url,
        default_device_type = %config.gateway.default_device_type,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let registry = Arc::new(startup::open_registry(&config).await?);

    let listener = TcpListener::bind(&config.gateway.bind_address).await?;

    let shutdown = Shutdown::new();
    let server = GatewayServer::new(&config.gateway, registry, config.gas.ack);
    let receiver = shutdown.subscribe();
    let serve = tokio::spawn(server.run(listener, receiver));

    signals::shutdown_signal().await;
    shutdown.trigger();

    serve.await??;
    tracing::info!("firmware-gateway stopped");
    Ok(())
}
