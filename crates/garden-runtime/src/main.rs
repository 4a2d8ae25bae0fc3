//! # Garden Runtime
//!
//! Entry point: reads `Operation`s from stdin, one JSON object per line,
//! and writes one JSON reply per line to stdout. Logs go to stderr.

use anyhow::{Context, Result};
use garden_runtime::{run_shell, GardenConfig, GardenRuntime};
use garden_telemetry::init_telemetry;
use tokio::io::BufReader;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = GardenConfig::from_env().context("Invalid configuration")?;

    let _telemetry =
        init_telemetry(config.telemetry()).context("Failed to initialize telemetry")?;

    let runtime = GardenRuntime::new(config).context("Failed to create garden runtime")?;
    runtime.start();

    info!("Garden is running. Close stdin or press Ctrl+C to stop.");
    let stdin = BufReader::new(tokio::io::stdin());
    tokio::select! {
        result = run_shell(runtime.router(), stdin, tokio::io::stdout()) => match result {
            Ok(handled) => info!(handled, "Input closed"),
            Err(e) => error!(error = %e, "Operation shell failed"),
        },
        _ = tokio::signal::ctrl_c() => info!("Interrupt received"),
    }

    runtime.shutdown().await;

    Ok(())
}
