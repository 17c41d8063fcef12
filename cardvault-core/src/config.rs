//! Configuration management
//!
//! Settings live in `settings.json` inside the data directory:
//! ```json
//! {
//!   "store": { "backend": "local", "apiUrl": "http://127.0.0.1:3000", "timeoutSecs": 30 },
//!   "server": { "host": "127.0.0.1", "port": 3000 },
//!   "validation": { "enforceMinYear": true, "minYear": 25 }
//! }
//! ```
//! Keys this crate does not know about are kept when saving.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::validation::MIN_EXPIRY_YEAR;
use crate::domain::ExpiryPolicy;

pub const SETTINGS_FILE: &str = "settings.json";

const DEFAULT_API_URL: &str = "http://127.0.0.1:3000";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Where records are stored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// In-process DuckDB database in the data directory
    #[default]
    Local,
    /// A CardVault REST server
    Remote,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Remote => f.write_str("remote"),
        }
    }
}

impl FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "remote" => Ok(Self::Remote),
            other => bail!("Unknown backend '{}'. Expected 'local' or 'remote'", other),
        }
    }
}

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    store: StoreSettings,
    #[serde(default)]
    server: ServerSettings,
    #[serde(default)]
    validation: ValidationSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreSettings {
    #[serde(default)]
    backend: Backend,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timeout_secs: Option<u64>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    port: Option<u16>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidationSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    enforce_min_year: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    min_year: Option<u32>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// CardVault configuration (resolved view of settings plus environment)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub backend: Backend,
    pub api_url: String,
    pub timeout_secs: u64,
    pub host: String,
    pub port: u16,
    pub enforce_min_year: bool,
    pub min_year: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::Local,
            api_url: DEFAULT_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            enforce_min_year: true,
            min_year: MIN_EXPIRY_YEAR,
        }
    }
}

impl Config {
    /// Load config from the data directory, applying environment overrides
    ///
    /// Overrides: `CARDVAULT_BACKEND`, `CARDVAULT_API_URL`, `CARDVAULT_HOST`,
    /// `CARDVAULT_PORT`.
    pub fn load(data_dir: &Path) -> Result<Self> {
        Self::load_with_env(data_dir, |key| std::env::var(key).ok())
    }

    /// Same as [`Config::load`] with an explicit environment lookup
    pub fn load_with_env(data_dir: &Path, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let raw = read_settings(data_dir)?;
        let defaults = Self::default();

        let mut config = Self {
            backend: raw.store.backend,
            api_url: raw.store.api_url.unwrap_or(defaults.api_url),
            timeout_secs: raw.store.timeout_secs.unwrap_or(defaults.timeout_secs),
            host: raw.server.host.unwrap_or(defaults.host),
            port: raw.server.port.unwrap_or(defaults.port),
            enforce_min_year: raw
                .validation
                .enforce_min_year
                .unwrap_or(defaults.enforce_min_year),
            min_year: raw.validation.min_year.unwrap_or(defaults.min_year),
        };

        if let Some(backend) = env("CARDVAULT_BACKEND").filter(|v| !v.is_empty()) {
            config.backend = backend
                .parse()
                .context("Invalid CARDVAULT_BACKEND")?;
        }
        if let Some(url) = env("CARDVAULT_API_URL").filter(|v| !v.is_empty()) {
            config.api_url = url;
        }
        if let Some(host) = env("CARDVAULT_HOST").filter(|v| !v.is_empty()) {
            config.host = host;
        }
        if let Some(port) = env("CARDVAULT_PORT").filter(|v| !v.is_empty()) {
            config.port = port
                .parse()
                .with_context(|| format!("Invalid CARDVAULT_PORT '{}'", port))?;
        }

        Ok(config)
    }

    /// Save config to the data directory
    /// Preserves other settings that the CLI doesn't manage
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let mut settings = read_settings(data_dir)?;

        // Update only the fields we manage
        settings.store.backend = self.backend;
        settings.store.api_url = Some(self.api_url.clone());

        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create {}", data_dir.display()))?;
        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(data_dir.join(SETTINGS_FILE), content)?;
        Ok(())
    }

    /// Switch backend, optionally pointing the remote store somewhere new
    pub fn set_backend(&mut self, backend: Backend, api_url: Option<String>) {
        self.backend = backend;
        if let Some(url) = api_url {
            self.api_url = url;
        }
    }

    /// Expiry rules for the record store
    pub fn expiry_policy(&self) -> ExpiryPolicy {
        ExpiryPolicy {
            enforce_min_year: self.enforce_min_year,
            min_year: self.min_year,
        }
    }

    /// `host:port` the server binds to
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn read_settings(data_dir: &Path) -> Result<SettingsFile> {
    let settings_path = data_dir.join(SETTINGS_FILE);
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }

    let content = std::fs::read_to_string(&settings_path)
        .with_context(|| format!("Failed to read {}", settings_path.display()))?;
    match serde_json::from_str(&content) {
        Ok(settings) => Ok(settings),
        Err(e) => {
            tracing::warn!(path = %settings_path.display(), error = %e, "Ignoring malformed settings file");
            Ok(SettingsFile::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_without_file() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_with_env(dir.path(), no_env).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.expiry_policy(), ExpiryPolicy::default());
        assert_eq!(config.server_addr(), "127.0.0.1:3000");
    }

    #[test]
    fn test_reads_camel_case_settings() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{
                "store": { "backend": "remote", "apiUrl": "http://cards.internal:8080", "timeoutSecs": 5 },
                "server": { "port": 4000 },
                "validation": { "enforceMinYear": false }
            }"#,
        )
        .unwrap();

        let config = Config::load_with_env(dir.path(), no_env).unwrap();
        assert_eq!(config.backend, Backend::Remote);
        assert_eq!(config.api_url, "http://cards.internal:8080");
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.port, 4000);
        assert_eq!(config.host, "127.0.0.1");
        assert!(!config.expiry_policy().enforce_min_year);
        assert_eq!(config.min_year, 25);
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = TempDir::new().unwrap();
        let env = |key: &str| match key {
            "CARDVAULT_BACKEND" => Some("REMOTE".to_string()),
            "CARDVAULT_PORT" => Some("8081".to_string()),
            _ => None,
        };
        let config = Config::load_with_env(dir.path(), env).unwrap();
        assert_eq!(config.backend, Backend::Remote);
        assert_eq!(config.port, 8081);
    }

    #[test]
    fn test_invalid_env_values_fail() {
        let dir = TempDir::new().unwrap();
        let bad_port = |key: &str| (key == "CARDVAULT_PORT").then(|| "http".to_string());
        assert!(Config::load_with_env(dir.path(), bad_port).is_err());

        let bad_backend = |key: &str| (key == "CARDVAULT_BACKEND").then(|| "cloud".to_string());
        assert!(Config::load_with_env(dir.path(), bad_backend).is_err());
    }

    #[test]
    fn test_save_preserves_unknown_keys() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{ "theme": "dark", "store": { "retries": 3 }, "server": { "port": 4000 } }"#,
        )
        .unwrap();

        let mut config = Config::load_with_env(dir.path(), no_env).unwrap();
        config.set_backend(Backend::Remote, Some("http://10.0.0.2:3000".to_string()));
        config.save(dir.path()).unwrap();

        let saved: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join(SETTINGS_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(saved["theme"], "dark");
        assert_eq!(saved["store"]["retries"], 3);
        assert_eq!(saved["store"]["backend"], "remote");
        assert_eq!(saved["store"]["apiUrl"], "http://10.0.0.2:3000");
        assert_eq!(saved["server"]["port"], 4000);

        let reloaded = Config::load_with_env(dir.path(), no_env).unwrap();
        assert_eq!(reloaded.backend, Backend::Remote);
    }

    #[test]
    fn test_malformed_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), "{ not json").unwrap();
        let config = Config::load_with_env(dir.path(), no_env).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_backend_parsing() {
        assert_eq!("local".parse::<Backend>().unwrap(), Backend::Local);
        assert_eq!(" Remote ".parse::<Backend>().unwrap(), Backend::Remote);
        assert!("sqlite".parse::<Backend>().is_err());
        assert_eq!(Backend::Remote.to_string(), "remote");
    }
}
