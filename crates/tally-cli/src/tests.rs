//! CLI command tests

use std::io::Write;

use tally_core::db::Database;
use tally_core::models::IngestStatus;
use tally_core::TallyConfig;
use tempfile::NamedTempFile;

use crate::commands::{self, truncate};

const LEDGER_CSV: &str = r#"Date,Amount,Where?,What?,Category,Source
"Sat, 03 May 2025",25.50,Cafe Luna,Lunch,Food,Credit Card
"Sat, 10 May 2025",12.00,Corner Deli,Sandwich,Food,Cash
"Mon, 12 May 2025",150.00,Airline,Flight,Travel,Credit Card
"Sun, 01 Jun 2025",15.50,Uber,Ride,Travel,Cash
"#;

fn setup_test_db() -> Database {
    Database::in_memory().unwrap()
}

fn write_csv(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn seeded_db() -> Database {
    let db = setup_test_db();
    db.ingest_csv("ledger.csv", LEDGER_CSV.as_bytes()).unwrap();
    db
}

// ========== Helper Tests ==========

#[test]
fn test_truncate_short() {
    assert_eq!(truncate("Uber", 10), "Uber");
}

#[test]
fn test_truncate_long() {
    assert_eq!(truncate("Corner Deli Sandwiches", 10), "Corner ...");
}

#[test]
fn test_truncate_multibyte() {
    assert_eq!(truncate("Café Crème Brûlée", 8), "Café ...");
}

#[test]
fn test_open_db_unencrypted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tally.db");
    let db = commands::open_db(&path, true).unwrap();
    assert!(db.list_ingests(10).unwrap().is_empty());
    assert!(!db.is_encrypted().unwrap());
    assert_eq!(db.path(), path.to_str().unwrap());
    assert!(path.exists());
}

#[test]
fn test_cmd_init_unencrypted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tally.db");
    assert!(commands::cmd_init(&path, true).is_ok());
    assert!(path.exists());
}

#[test]
fn test_load_config_explicit_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[vocabulary]\nknown_categories = [\"Groceries\", \"Rent\"]").unwrap();

    let config = commands::load_config(Some(file.path())).unwrap();
    assert_eq!(config.known_categories, vec!["Groceries", "Rent"]);
    assert_eq!(config.default_top_k, TallyConfig::default().default_top_k);
}

// ========== Import Command Tests ==========

#[test]
fn test_cmd_import() {
    let db = setup_test_db();
    let csv = write_csv(LEDGER_CSV);

    assert!(commands::cmd_import(&db, csv.path()).is_ok());

    let ingests = db.list_ingests(10).unwrap();
    assert_eq!(ingests.len(), 1);
    assert_eq!(ingests[0].status, IngestStatus::Success);
    assert_eq!(ingests[0].row_count, 4);
}

#[test]
fn test_cmd_import_duplicate_file_still_ingests() {
    let db = setup_test_db();
    let csv = write_csv(LEDGER_CSV);

    commands::cmd_import(&db, csv.path()).unwrap();
    commands::cmd_import(&db, csv.path()).unwrap();

    assert_eq!(db.list_ingests(10).unwrap().len(), 2);
    let totals = db.monthly_totals("2025-06").unwrap();
    assert_eq!(totals.transaction_count, 2);
}

#[test]
fn test_cmd_import_missing_column_fails() {
    let db = setup_test_db();
    let csv = write_csv("Date,Amount,Where?,What?,Category\n\"Sat, 03 May 2025\",1.00,A,B,Food\n");

    assert!(commands::cmd_import(&db, csv.path()).is_err());

    let ingests = db.list_ingests(10).unwrap();
    assert_eq!(ingests.len(), 1);
    assert_eq!(ingests[0].status, IngestStatus::Failed);
    assert!(db.monthly_totals("2025-05").unwrap().transaction_count == 0);
}

#[test]
fn test_cmd_import_missing_file() {
    let db = setup_test_db();
    let result = commands::cmd_import(&db, std::path::Path::new("/nonexistent/ledger.csv"));
    assert!(result.is_err());
    assert!(db.list_ingests(10).unwrap().is_empty());
}

#[test]
fn test_cmd_ingests_empty() {
    let db = setup_test_db();
    assert!(commands::cmd_ingests(&db, 20).is_ok());
}

#[test]
fn test_cmd_ingests_with_history() {
    let db = seeded_db();
    let _ = db.ingest_csv("bad.csv", b"Date,Amount\n");
    assert!(commands::cmd_ingests(&db, 20).is_ok());
}

// ========== Ask Command Tests ==========

#[test]
fn test_cmd_ask_answer() {
    let db = seeded_db();
    let config = TallyConfig::default();
    let result = commands::cmd_ask(
        &db,
        &config,
        "How much did I spend on Food in 2025-05?",
        None,
        None,
        false,
    );
    assert!(result.is_ok());
}

#[test]
fn test_cmd_ask_json() {
    let db = seeded_db();
    let config = TallyConfig::default();
    let result = commands::cmd_ask(
        &db,
        &config,
        "top merchants",
        Some("2025-05"),
        Some(2),
        true,
    );
    assert!(result.is_ok());
}

#[test]
fn test_cmd_ask_clarification_is_not_an_error() {
    let db = seeded_db();
    let config = TallyConfig::default();
    assert!(commands::cmd_ask(&db, &config, "How much on Food?", None, None, false).is_ok());
    assert!(
        commands::cmd_ask(&db, &config, "spend on Food", Some("2025-13"), None, false).is_ok()
    );
}

// ========== Summary Command Tests ==========

#[test]
fn test_cmd_summary() {
    let db = seeded_db();
    let config = TallyConfig::default();
    assert!(commands::cmd_summary(&db, &config, "2025-05", None).is_ok());
    assert!(commands::cmd_summary(&db, &config, "2024-01", Some(3)).is_ok());
}

#[test]
fn test_cmd_summary_invalid_month() {
    let db = seeded_db();
    let config = TallyConfig::default();
    let err = commands::cmd_summary(&db, &config, "2025-13", None).unwrap_err();
    assert!(err.to_string().contains("Month must be between 01-12"));
}

#[test]
fn test_cmd_summary_top_k_out_of_range() {
    let db = seeded_db();
    let config = TallyConfig::default();
    assert!(commands::cmd_summary(&db, &config, "2025-05", Some(0)).is_err());
    assert!(commands::cmd_summary(&db, &config, "2025-05", Some(config.max_top_k + 1)).is_err());
    assert!(commands::cmd_summary(&db, &config, "2025-05", Some(config.max_top_k)).is_ok());
}
