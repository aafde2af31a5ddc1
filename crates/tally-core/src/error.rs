//! Error types for Tally

use thiserror::Error;

use crate::month::InvalidMonth;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error(transparent)]
    InvalidMonth(#[from] InvalidMonth),

    #[error("Import error: {0}")]
    Import(String),

    #[error("Ingest {ingest_id} failed: {message}")]
    IngestFailed {
        ingest_id: String,
        row_count: usize,
        message: String,
    },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;
