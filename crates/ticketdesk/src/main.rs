// SPDX-FileCopyrightText: 2026 Ticketdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticketdesk - operator tooling for the support-ticket state store.
//!
//! Inspects, checks and migrates the encrypted staff and tickets documents
//! that the bot keeps in its data directory.

mod check;
mod migrate;
mod status;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use ticketdesk_config::TicketdeskConfig;
use tracing_subscriber::EnvFilter;

/// Ticketdesk - operator tooling for the support-ticket state store.
#[derive(Parser, Debug)]
#[command(name = "ticketdesk", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Summarize what is stored in the data directory.
    Status {
        /// Print machine-readable JSON.
        #[arg(long)]
        json: bool,
        /// Disable colors.
        #[arg(long)]
        plain: bool,
    },
    /// Rewrite legacy CBC envelopes as GCM.
    Migrate {
        /// Disable colors.
        #[arg(long)]
        plain: bool,
    },
    /// Check configuration, key material and both documents.
    Check {
        /// Disable colors.
        #[arg(long)]
        plain: bool,
    },
}

fn init_tracing(config: &TicketdeskConfig) {
    let level = &config.logging.level;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ticketdesk={level},warn")));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => ticketdesk_config::load_and_validate_path(path),
        None => ticketdesk_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            ticketdesk_config::render_errors(&errors);
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config);

    let result = match cli.command {
        Some(Commands::Status { json, plain }) => status::run_status(&config, json, plain).await,
        Some(Commands::Migrate { plain }) => migrate::run_migrate(&config, plain).await,
        Some(Commands::Check { plain }) => check::run_check(&config, plain).await,
        None => {
            println!("ticketdesk: use --help for available commands");
            Ok(true)
        }
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("ticketdesk: {e}");
            ExitCode::FAILURE
        }
    }
}
