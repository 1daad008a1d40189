//! CLI command implementations

pub mod activity;
pub mod admin;
pub mod init;
pub mod maintain;
pub mod profile;
pub mod quests;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use questline::{Clock, Config, Engine};

/// Load config (explicit path, global file or defaults) and open the engine
pub fn open_engine(config_path: Option<&Path>, db: Option<PathBuf>) -> Result<Engine> {
    let mut config = match config_path {
        Some(path) => Config::from_file(path)?,
        None => Config::load_or_default()?,
    };
    if db.is_some() {
        config.database.path = db;
    }

    let db_path = config.database_path();
    Engine::open(config, Clock::system())
        .with_context(|| format!("Failed to open engine at {}", db_path.display()))
}

/// Command output goes to stdout as pretty JSON
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
