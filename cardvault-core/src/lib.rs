//! CardVault Core - credit card and user records
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Records (CreditCard, User), field validation and errors
//! - **ports**: Trait definitions for external dependencies (Repository, RecordStore)
//! - **services**: Business logic orchestration
//! - **adapters**: Concrete implementations (DuckDB, local and remote stores)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use adapters::{LocalStore, RemoteStore};
use config::{Backend, Config};

// Re-export commonly used types at crate root
pub use domain::result::{Error, Result};
pub use domain::{
    CardDetails, CardPatch, CardQuery, CreditCard, Deleted, ErrorBody, ExpiryPolicy, NewCard,
    NewUser, User, UserDetails, UserPatch, ValidationReport,
};
pub use ports::{RecordStore, Repository};
pub use services::{Entity, EntryPoint, LogEvent, LoggingService};

/// Record database file inside the data directory
pub const DB_FILE: &str = "cardvault.duckdb";

/// Main context for CardVault operations
///
/// Holds the resolved configuration and the record store selected by it.
pub struct CardVaultContext {
    pub config: Config,
    pub data_dir: PathBuf,
    pub store: Arc<dyn RecordStore>,
}

impl CardVaultContext {
    /// Load settings from `data_dir` and open the configured backend
    pub fn new(data_dir: &Path) -> anyhow::Result<Self> {
        let config = Config::load(data_dir)?;
        Self::with_config(data_dir, config)
    }

    pub fn with_config(data_dir: &Path, config: Config) -> anyhow::Result<Self> {
        let store: Arc<dyn RecordStore> = match config.backend {
            Backend::Local => Arc::new(Self::open_local(data_dir, &config)?),
            Backend::Remote => Arc::new(RemoteStore::new(
                &config.api_url,
                Duration::from_secs(config.timeout_secs),
            )?),
        };
        tracing::debug!(backend = store.backend(), "Record store ready");

        Ok(Self {
            config,
            data_dir: data_dir.to_path_buf(),
            store,
        })
    }

    /// Always use the local database, whatever the configured backend
    ///
    /// The REST server serves its own data directory.
    pub fn local(data_dir: &Path, config: Config) -> anyhow::Result<Self> {
        let store = Arc::new(Self::open_local(data_dir, &config)?);
        Ok(Self {
            config,
            data_dir: data_dir.to_path_buf(),
            store,
        })
    }

    fn open_local(data_dir: &Path, config: &Config) -> anyhow::Result<LocalStore> {
        std::fs::create_dir_all(data_dir)?;
        LocalStore::open(&data_dir.join(DB_FILE), config.expiry_policy())
    }

    /// Path of the local record database
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE)
    }
}
