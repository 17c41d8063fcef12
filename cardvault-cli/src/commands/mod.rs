//! CLI command implementations

pub mod card;
pub mod config;
pub mod logs;
pub mod serve;
pub mod user;
pub mod validate;

use std::path::PathBuf;

use anyhow::{Context, Result};
use cardvault_core::{CardVaultContext, EntryPoint, LogEvent, LoggingService};

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let data_dir = get_data_dir().ok()?;
    std::fs::create_dir_all(&data_dir).ok()?;
    LoggingService::new(&data_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Get the data directory from `CARDVAULT_DIR` or default to `~/.cardvault`
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("CARDVAULT_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".cardvault"))
        .context("Could not find home directory, set CARDVAULT_DIR")
}

/// Load settings and open the configured record store
pub fn get_context() -> Result<CardVaultContext> {
    let data_dir = get_data_dir()?;
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;

    CardVaultContext::new(&data_dir).context("Failed to initialize record store")
}

/// Print `value` as pretty JSON
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
