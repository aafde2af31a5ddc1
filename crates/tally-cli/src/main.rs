//! Tally CLI - Ledger question answering
//!
//! Usage:
//!   tally init                          Initialize database
//!   tally import --file ledger.csv      Ingest a ledger export
//!   tally ask "spend on Food in May 2025"
//!   tally summary --month 2025-05       Monthly report
//!   tally serve --port 3000             Start web server

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Import { file } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_import(&db, &file)
        }
        Commands::Ask {
            question,
            month,
            limit,
            json,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let config = commands::load_config(cli.config.as_deref())?;
            commands::cmd_ask(&db, &config, &question, month.as_deref(), limit, json)
        }
        Commands::Summary { month, top_k } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let config = commands::load_config(cli.config.as_deref())?;
            commands::cmd_summary(&db, &config, &month, top_k)
        }
        Commands::Ingests { limit } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_ingests(&db, limit)
        }
        Commands::Serve {
            port,
            host,
            no_auth,
        } => {
            let config = commands::load_config(cli.config.as_deref())?;
            commands::cmd_serve(&cli.db, config, &host, port, no_auth, cli.no_encrypt).await
        }
    }
}
