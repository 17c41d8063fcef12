//! Serve command - run the REST server over the local database

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use cardvault_core::config::Config;
use cardvault_core::{CardVaultContext, EntryPoint, LoggingService};
use cardvault_server::{init_tracing, start_server, AppState};

use super::get_data_dir;

pub async fn run(host: Option<String>, port: Option<u16>) -> Result<()> {
    init_tracing();

    let data_dir = get_data_dir()?;
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;

    let mut config = Config::load(&data_dir)?;
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .with_context(|| format!("Invalid listen address: {}", config.server_addr()))?;

    // The server always owns the local database, even when the CLI is set to remote
    let ctx = CardVaultContext::local(&data_dir, config)?;
    let mut state = AppState::new(ctx.store.clone());
    match LoggingService::new(&data_dir, EntryPoint::Server, env!("CARGO_PKG_VERSION")) {
        Ok(events) => state = state.with_events(Arc::new(events)),
        Err(e) => tracing::warn!(error = %e, "Event log unavailable"),
    }

    start_server(addr, state).await
}
