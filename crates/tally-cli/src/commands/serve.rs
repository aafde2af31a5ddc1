//! Server command implementation

use std::path::Path;

use anyhow::Result;
use tally_core::TallyConfig;
use tally_server::{parse_api_keys, ServerConfig, API_KEYS_ENV};

use super::open_db;

pub async fn cmd_serve(
    db_path: &Path,
    config: TallyConfig,
    host: &str,
    port: u16,
    no_auth: bool,
    no_encrypt: bool,
) -> Result<()> {
    println!("🚀 Starting Tally web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);
    println!("   Categories: {}", config.known_categories.join(", "));

    let api_keys = parse_api_keys(&std::env::var(API_KEYS_ENV).unwrap_or_default());

    if no_auth {
        println!();
        println!("   ⚠️  Authentication DISABLED - do not expose to network!");
    } else if api_keys.is_empty() {
        println!(
            "   🔒 Authentication: no API keys set, /api requests will be rejected ({})",
            API_KEYS_ENV
        );
    } else {
        println!(
            "   🔑 API keys: {} configured ({})",
            api_keys.len(),
            API_KEYS_ENV
        );
    }
    if no_encrypt {
        println!("   ⚠️  Encryption DISABLED (--no-encrypt)");
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let db = open_db(db_path, no_encrypt)?;

    let server = ServerConfig {
        require_auth: !no_auth,
        allowed_origins: vec![],
        api_keys,
    };

    tally_server::serve(db, config, host, port, server).await?;

    Ok(())
}
