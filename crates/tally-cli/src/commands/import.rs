//! Ingest command implementations

use std::path::Path;

use anyhow::{Context, Result};
use tally_core::{db::Database, import::file_hash, models::IngestStatus, Error};

use super::truncate;

pub fn cmd_import(db: &Database, file: &Path) -> Result<()> {
    let bytes =
        std::fs::read(file).with_context(|| format!("Failed to read file: {}", file.display()))?;
    let filename = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());

    println!("📥 Ingesting {}...", file.display());

    if let Some(previous) = db.find_ingest_by_hash(&file_hash(&bytes))? {
        println!(
            "   ⚠️  This file was already ingested on {} ({} rows, ingest {})",
            previous.created_at.format("%Y-%m-%d %H:%M"),
            previous.row_count,
            previous.id
        );
        println!("      Ingesting again will count its transactions twice.");
    }

    let summary = match db.ingest_csv(&filename, &bytes) {
        Ok(summary) => summary,
        Err(Error::IngestFailed {
            ingest_id, message, ..
        }) => {
            println!("❌ Ingest failed: {}", message);
            println!("   Recorded as failed ingest {}", ingest_id);
            anyhow::bail!("No transactions were stored");
        }
        Err(e) => return Err(e).context("Failed to ingest CSV"),
    };

    println!("✅ Ingest complete!");
    println!("   Ingest ID: {}", summary.ingest_id);
    println!("   Rows: {}", summary.row_count);
    if let Some(range) = summary.date_range {
        println!("   Dates: {} to {}", range.min, range.max);
    }
    if !summary.categories_seen.is_empty() {
        println!("   Categories: {}", summary.categories_seen.join(", "));
    }
    if !summary.sources_seen.is_empty() {
        println!("   Sources: {}", summary.sources_seen.join(", "));
    }
    println!();
    println!("   💡 {}", summary.notes);

    Ok(())
}

pub fn cmd_ingests(db: &Database, limit: usize) -> Result<()> {
    let ingests = db.list_ingests(limit)?;

    if ingests.is_empty() {
        println!("No ingests yet. Add a ledger with:");
        println!("  tally import --file ledger.csv");
        return Ok(());
    }

    println!();
    println!("📚 Ingest History");
    println!("   ─────────────────────────────────────────────────────────────");

    for ingest in ingests {
        let status = match ingest.status {
            IngestStatus::Success => "✅",
            IngestStatus::Failed => "❌",
        };
        println!(
            "   {} {} │ {:>6} rows │ {}",
            status,
            ingest.created_at.format("%Y-%m-%d %H:%M"),
            ingest.row_count,
            truncate(&ingest.filename, 40)
        );
        println!("      {}", ingest.id);
        if let Some(error) = &ingest.error {
            println!("      {}", truncate(error, 70));
        }
    }

    Ok(())
}
