//! maintain command: one sweep, or a loop until Ctrl-C

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use questline::{maintenance, Engine};

use super::print_json;

pub async fn maintain_command(engine: Engine, watch: bool, interval_secs: Option<u64>) -> Result<()> {
    if !watch {
        let report = tokio::task::spawn_blocking(move || engine.run_maintenance())
            .await
            .context("Maintenance task panicked")??;
        return print_json(&report);
    }

    let secs = interval_secs.unwrap_or(engine.config().maintenance.interval_secs).max(1);
    let handle = maintenance::spawn(engine, Duration::from_secs(secs));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Stopping maintenance loop");
    let sweeps = handle.stop().await;
    println!("{} sweeps", sweeps);
    Ok(())
}
