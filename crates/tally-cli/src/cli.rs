//! CLI argument definitions using clap
//!
//! The command implementations live in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Tally - Ask deterministic questions about your spending
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Traceable question answering over a personal ledger", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "tally.db", global = true)]
    pub db: PathBuf,

    /// Config file overriding the category vocabulary and limits
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set TALLY_DB_KEY environment variable with your passphrase.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Ingest a ledger CSV (Date,Amount,Where?,What?,Category,Source)
    Import {
        /// CSV file to ingest
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Ask a question about one month of spending
    Ask {
        /// The question, e.g. "How much did I spend on Food in 2025-05?"
        question: String,

        /// Month to use instead of one found in the question (YYYY-MM)
        #[arg(short, long)]
        month: Option<String>,

        /// Maximum evidence rows to show
        #[arg(short, long)]
        limit: Option<i64>,

        /// Print the full response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the monthly report
    Summary {
        /// Month to report on (YYYY-MM)
        #[arg(short, long)]
        month: String,

        /// Number of top merchants
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Show ingest history
    Ingests {
        /// Number of ingests to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Disable authentication (for local development only)
        ///
        /// WARNING: Do not use this flag when exposing the server to a network.
        /// By default, /api requests need a bearer key from TALLY_API_KEYS.
        #[arg(long)]
        no_auth: bool,
    },
}
