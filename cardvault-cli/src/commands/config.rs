//! Config command - inspect settings and switch the record backend

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use cardvault_core::adapters::RemoteStore;
use cardvault_core::config::{Backend, Config};

use super::{get_data_dir, print_json};
use crate::output;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the resolved configuration
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Choose where records are stored
    Backend {
        /// `local` (DuckDB file) or `remote` (REST server)
        backend: Backend,
        /// Server URL for the remote backend
        #[arg(long)]
        url: Option<String>,
    },
}

pub fn run(command: ConfigCommands) -> Result<()> {
    let data_dir = get_data_dir()?;

    match command {
        ConfigCommands::Show { json } => {
            let config = Config::load(&data_dir)?;
            if json {
                return print_json(&config);
            }

            let mut table = output::create_table();
            table.add_row(vec!["Data directory".to_string(), data_dir.display().to_string()]);
            table.add_row(vec!["Backend".to_string(), config.backend.to_string()]);
            table.add_row(vec!["API URL".to_string(), config.api_url.clone()]);
            table.add_row(vec!["Timeout".to_string(), format!("{}s", config.timeout_secs)]);
            table.add_row(vec!["Server address".to_string(), config.server_addr()]);
            table.add_row(vec![
                "Minimum expiry year".to_string(),
                if config.enforce_min_year {
                    format!("20{:02}", config.min_year)
                } else {
                    "off".to_string()
                },
            ]);
            println!("{}", table);
        }
        ConfigCommands::Backend { backend, url } => {
            std::fs::create_dir_all(&data_dir)?;
            let mut config = Config::load(&data_dir)?;
            config.set_backend(backend, url);

            if backend == Backend::Remote {
                // Reject URLs the remote store could never use
                RemoteStore::new(
                    &config.api_url,
                    std::time::Duration::from_secs(config.timeout_secs),
                )?;
            }
            config.save(&data_dir)?;

            output::success(&format!("Backend set to {}", backend));
            if backend == Backend::Remote {
                println!("  {}", config.api_url.dimmed());
            }
        }
    }

    Ok(())
}
