//! vendlink daemon.
//!
//! Drives a vending peripheral on a Linux I2C bus, validates cards against
//! the balance service and mirrors progress on a console status display.
//!
//! All settings come from the environment; see [`config`]. Log verbosity
//! follows `RUST_LOG` and defaults to `info,vendlink=debug`.

mod config;

use anyhow::Context;
use linux_embedded_hal::I2cdev;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use vendlink_controller::TransactionController;
use vendlink_controller::display::ConsoleDisplay;
use vendlink_hardware::I2cPeripheralLink;
use vendlink_network::ValidationClient;

use crate::config::DaemonConfig;

const DEFAULT_LOG_FILTER: &str = "info,vendlink=debug";

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!(version = env!("CARGO_PKG_VERSION"), "vendlink starting");

    let config = DaemonConfig::from_env().context("invalid configuration")?;
    info!(?config, "Configuration loaded");

    let bus = I2cdev::new(&config.i2c_device)
        .with_context(|| format!("failed to open {}", config.i2c_device.display()))?;
    let link = I2cPeripheralLink::with_address(
        bus,
        config.controller.peripheral_address,
        config.controller.read_len,
    );

    let client = ValidationClient::new(config.client_config()?)
        .context("failed to build validation client")?;

    let display = ConsoleDisplay::new(
        std::io::stdout(),
        config.display_lines,
        config.display_columns,
    );

    let mut controller =
        TransactionController::new(link, client, display, config.controller.clone());

    // Without a display there is nothing to show the customer.
    controller.boot().context("display unavailable, halting")?;

    match controller.validator().probe().await {
        Ok(status) => info!(status, "Balance service reachable"),
        Err(e) => warn!(error = %e, "Balance service probe failed"),
    }

    tokio::time::sleep(config.startup_delay).await;

    controller.run_until(shutdown_signal()).await;

    info!("vendlink stopped");
    Ok(())
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
