//! Ledger store: connection pooling, migrations and read snapshots
//!
//! This module is organized by domain:
//! - `ingest` - CSV ingestion and ingest history
//! - `ledger_filter` - Shared month/kind/entity filter for metrics and evidence
//! - `metrics` - Month-scoped aggregates
//! - `evidence` - Ordered row lookups backing an answer

use chrono::{DateTime, NaiveDate, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior};
use tracing::info;

use crate::error::{Error, Result};

mod evidence;
mod ingest;
mod ledger_filter;
mod metrics;

pub use ledger_filter::{AmountKind, FilterResult, GroupField, LedgerFilter};

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Environment variable for database encryption key
pub const DB_KEY_ENV: &str = "TALLY_DB_KEY";

/// Derive an encryption key from a passphrase using Argon2
///
/// Uses a fixed application salt so the same passphrase always produces the same key,
/// regardless of database path.
fn derive_key(passphrase: &str) -> Result<String> {
    use argon2::{password_hash::SaltString, Argon2, PasswordHasher};

    // Changing this invalidates every existing encrypted ledger
    const APP_SALT: &[u8; 16] = b"tally-salt-v1-lg";

    let salt = SaltString::encode_b64(APP_SALT)
        .map_err(|e| Error::Encryption(format!("Failed to create salt: {}", e)))?;

    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(passphrase.as_bytes(), &salt)
        .map_err(|e| Error::Encryption(format!("Failed to derive key: {}", e)))?;

    let hash_str = hash
        .hash
        .ok_or_else(|| Error::Encryption("No hash output".to_string()))?;
    Ok(hex::encode(hash_str.as_bytes()))
}

/// Parse a SQLite datetime string into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    // SQLite stores as "YYYY-MM-DD HH:MM:SS" format
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Read a `YYYY-MM-DD` text column as a date
pub(crate) fn date_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let text: String = row.get(idx)?;
    NaiveDate::parse_from_str(&text, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
    /// Whether connections unlock the file with a derived key
    keyed: bool,
}

/// A consistent read view of the ledger.
///
/// Every query made through one snapshot sees the same committed data, even
/// if an ingest commits in between.
pub struct Snapshot<'conn> {
    conn: &'conn Connection,
}

impl Database {
    /// Create a new database connection pool with encryption
    ///
    /// Requires `TALLY_DB_KEY` environment variable to be set.
    /// Returns an error if it is not. Use `new_unencrypted()` for
    /// development/testing without encryption.
    pub fn new(path: &str) -> Result<Self> {
        match std::env::var(DB_KEY_ENV).ok() {
            Some(key) => Self::new_with_key(path, Some(&key)),
            None => Err(Error::Encryption(format!(
                "Database encryption required. Set {} environment variable with your passphrase, \
                or use --no-encrypt for unencrypted databases (not recommended for production).",
                DB_KEY_ENV
            ))),
        }
    }

    /// Create a new unencrypted database connection pool
    pub fn new_unencrypted(path: &str) -> Result<Self> {
        Self::new_with_key(path, None)
    }

    /// Create a new database with an explicit encryption key
    pub fn new_with_key(path: &str, passphrase: Option<&str>) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);

        let pool = if let Some(pass) = passphrase {
            let key = derive_key(pass)?;
            let key_pragma = format!("PRAGMA key = 'x\"{}\"';", key);

            // Every pooled connection must unlock the file itself
            let manager = manager.with_init(move |conn| {
                conn.execute_batch(&key_pragma)?;
                conn.execute_batch("PRAGMA foreign_keys = ON;")?;
                Ok(())
            });

            Pool::builder().max_size(10).build(manager)?
        } else {
            let manager =
                manager.with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
            Pool::builder().max_size(10).build(manager)?
        };

        let db = Self {
            pool,
            db_path: path.to_string(),
            keyed: passphrase.is_some(),
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create a throwaway database (for testing)
    ///
    /// Note: Uses a temporary file rather than `:memory:` because each pooled
    /// connection would otherwise get its own empty database.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "tally_test_{}_{}.db",
            std::process::id(),
            id
        ));
        let path = path.to_string_lossy().into_owned();

        // Remove leftovers from an earlier run
        let _ = std::fs::remove_file(&path);

        Self::new_unencrypted(&path)
    }

    /// Check if the database is encrypted
    ///
    /// True when the pool was opened with a key and the linked SQLite is
    /// SQLCipher (which reports a `cipher_version`).
    pub fn is_encrypted(&self) -> Result<bool> {
        if !self.keyed {
            return Ok(false);
        }
        let conn = self.conn()?;
        let version: Option<String> = conn
            .query_row("PRAGMA cipher_version;", [], |row| row.get(0))
            .optional()?;
        Ok(version.is_some_and(|v| !v.is_empty()))
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Run `f` against one consistent read view of the ledger.
    ///
    /// The closure gets a single pooled connection inside a deferred
    /// transaction; the snapshot is fixed at its first read.
    pub fn read_snapshot<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Snapshot<'_>) -> Result<T>,
    {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
        let value = f(&Snapshot { conn: &tx })?;
        tx.commit()?;
        Ok(value)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            -- WAL mode: readers keep their snapshot while an ingest writes
            -- Note: creates -wal and -shm sidecar files alongside the database
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;

            -- One row per upload attempt, successful or not
            CREATE TABLE IF NOT EXISTS ingests (
                id TEXT PRIMARY KEY,
                filename TEXT NOT NULL,
                row_count INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL,                    -- success, failed
                error TEXT,
                file_hash TEXT NOT NULL,                 -- SHA-256 of the uploaded bytes
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_ingests_hash ON ingests(file_hash);

            -- Ledger entries. Amounts are integer cents; positive = expense.
            -- year_month and abs_amount_cents are derived on insert.
            CREATE TABLE IF NOT EXISTS transactions (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                ingest_id TEXT NOT NULL REFERENCES ingests(id),
                date DATE NOT NULL,
                year_month TEXT NOT NULL,
                amount_cents INTEGER NOT NULL,
                abs_amount_cents INTEGER NOT NULL,
                merchant TEXT,
                description TEXT,
                category TEXT,
                source TEXT,
                raw_row TEXT,                            -- JSON of the original CSV row
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_transactions_month ON transactions(year_month);
            CREATE INDEX IF NOT EXISTS idx_transactions_category ON transactions(category, year_month);
            CREATE INDEX IF NOT EXISTS idx_transactions_merchant ON transactions(merchant, year_month);
            CREATE INDEX IF NOT EXISTS idx_transactions_source ON transactions(source, year_month);
            CREATE INDEX IF NOT EXISTS idx_transactions_ingest ON transactions(ingest_id);
            "#,
        )?;

        info!("Database schema initialized");
        Ok(())
    }
}
