//! Init command implementation

use anyhow::{bail, Result};
use std::path::Path;
use tracing::info;

use questline::Config;

/// Write the default configuration file
pub fn init_command(config_path: Option<&Path>, force: bool) -> Result<()> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(Config::global_config_path);

    if path.exists() && !force {
        bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    Config::default().save_to_file(&path)?;
    info!("Created configuration file at {}", path.display());
    println!("Wrote {}", path.display());
    Ok(())
}
