//! Tally Core Library
//!
//! Deterministic question answering over a personal transaction ledger:
//! - Ledger store (SQLite/SQLCipher) with CSV ingestion
//! - Month-scoped metrics and evidence lookups
//! - Month resolution, intent classification and entity extraction
//! - Traced answers with exact decimal numbers
//! - Configurable category vocabulary

pub mod config;
pub mod db;
pub mod error;
pub mod import;
pub mod models;
pub mod money;
pub mod month;
pub mod query;

pub use config::TallyConfig;
pub use db::{AmountKind, Database, GroupField, LedgerFilter, Snapshot};
pub use error::{Error, Result};
pub use month::{InvalidMonth, YearMonth};
pub use query::{
    Intent, NumberValue, Numbers, QueryEngine, QueryRequest, QueryResponse, QueryTrace,
};
