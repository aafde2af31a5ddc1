//! Shared utilities and the init command

use std::path::Path;

use anyhow::{Context, Result};
use tally_core::{db::Database, TallyConfig};
use tracing::debug;

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path must be valid UTF-8")?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

/// Load the query config, with --config taking precedence over the data dir
pub fn load_config(path: Option<&Path>) -> Result<TallyConfig> {
    let config = TallyConfig::load_from(path).context("Failed to load config")?;
    debug!(
        categories = ?config.known_categories,
        "Loaded query config"
    );
    Ok(config)
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path, no_encrypt)?;
    let encrypted = db.is_encrypted().context("Failed to check encryption")?;

    println!("   File: {}", db.path());
    if encrypted {
        println!("   🔒 Encryption: ENABLED");
    } else {
        println!("   ⚠️  Encryption: DISABLED");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Ingest a ledger: tally import --file ledger.csv");
    println!("  2. Ask a question: tally ask \"How much did I spend on Food in 2025-05?\"");

    Ok(())
}
