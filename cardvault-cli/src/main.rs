//! CardVault CLI - credit card and user records in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{card, config, logs, serve, user, validate};

/// CardVault - credit card and user records
#[derive(Parser)]
#[command(name = "cv", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage credit cards
    Card {
        #[command(subcommand)]
        command: card::CardCommands,
    },

    /// Manage users
    User {
        #[command(subcommand)]
        command: user::UserCommands,
    },

    /// Check card details without saving them
    Validate {
        #[arg(long, default_value = "")]
        number: String,
        #[arg(long, default_value = "")]
        holder: String,
        /// Expiry date (MM/YY)
        #[arg(long, default_value = "")]
        expiry: String,
        #[arg(long, default_value = "")]
        cvv: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the REST server over the local database
    Serve {
        /// Address to bind (overrides settings)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind (overrides settings)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },

    /// Show or change settings
    Config {
        #[command(subcommand)]
        command: config::ConfigCommands,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Card { command } => card::run(command).await,
        Commands::User { command } => user::run(command).await,
        Commands::Validate {
            number,
            holder,
            expiry,
            cvv,
            json,
        } => validate::run(&number, &holder, &expiry, &cvv, json),
        Commands::Serve { host, port } => serve::run(host, port).await,
        Commands::Logs { command } => logs::run(command),
        Commands::Config { command } => config::run(command),
    }
}
