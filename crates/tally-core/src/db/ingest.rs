//! CSV ingestion and ingest history

use std::collections::BTreeSet;

use rusqlite::{params, OptionalExtension};
use tracing::{info, warn};
use uuid::Uuid;

use super::{date_column, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::import;
use crate::models::{
    DateRange, Ingest, IngestStatus, IngestSummary, NewTransaction, Transaction,
};
use crate::money::{from_cents, to_cents};
use crate::month::YearMonth;

/// Reported with every successful ingest
pub const SIGN_CONVENTION_NOTE: &str =
    "Sign convention: expenses are positive numbers, income/settlements are negative numbers.";

impl Database {
    /// Parse and store a ledger CSV as one all-or-nothing batch.
    ///
    /// On any parse or validation failure a `failed` ingest record is kept
    /// and no transactions are written.
    pub fn ingest_csv(&self, filename: &str, bytes: &[u8]) -> Result<IngestSummary> {
        let file_hash = import::file_hash(bytes);

        match import::parse_csv(bytes) {
            Ok(rows) => self.import_transactions(filename, &file_hash, &rows),
            Err(e) => {
                let message = match e {
                    Error::Import(msg) => msg,
                    other => other.to_string(),
                };
                let ingest_id = self.record_failed_ingest(filename, &file_hash, &message)?;
                Err(Error::IngestFailed {
                    ingest_id,
                    row_count: 0,
                    message,
                })
            }
        }
    }

    /// Store already-normalized rows under a new ingest record.
    ///
    /// `year_month` and the absolute amount are derived here from each row.
    pub fn import_transactions(
        &self,
        filename: &str,
        file_hash: &str,
        rows: &[NewTransaction],
    ) -> Result<IngestSummary> {
        let ingest_id = Uuid::new_v4().to_string();

        if let Err(e) = self.write_batch(&ingest_id, filename, file_hash, rows) {
            let message = e.to_string();
            warn!(filename, error = %message, "Ingest rolled back");
            self.insert_ingest_record(
                &ingest_id,
                filename,
                file_hash,
                0,
                IngestStatus::Failed,
                Some(&message),
            )?;
            return Err(Error::IngestFailed {
                ingest_id,
                row_count: 0,
                message,
            });
        }

        let date_range = match (
            rows.iter().map(|r| r.date).min(),
            rows.iter().map(|r| r.date).max(),
        ) {
            (Some(min), Some(max)) => Some(DateRange { min, max }),
            _ => None,
        };
        let categories_seen: BTreeSet<String> =
            rows.iter().filter_map(|r| r.category.clone()).collect();
        let sources_seen: BTreeSet<String> =
            rows.iter().filter_map(|r| r.source.clone()).collect();

        info!(
            ingest_id = %ingest_id,
            filename,
            rows = rows.len(),
            "Ingest complete"
        );

        Ok(IngestSummary {
            ingest_id,
            row_count: rows.len(),
            date_range,
            categories_seen: categories_seen.into_iter().collect(),
            sources_seen: sources_seen.into_iter().collect(),
            notes: SIGN_CONVENTION_NOTE.to_string(),
        })
    }

    fn write_batch(
        &self,
        ingest_id: &str,
        filename: &str,
        file_hash: &str,
        rows: &[NewTransaction],
    ) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO ingests (id, filename, row_count, status, error, file_hash)
            VALUES (?, ?, ?, ?, NULL, ?)
            "#,
            params![
                ingest_id,
                filename,
                rows.len() as i64,
                IngestStatus::Success.as_str(),
                file_hash
            ],
        )?;

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO transactions
                    (id, ingest_id, date, year_month, amount_cents, abs_amount_cents,
                     merchant, description, category, source, raw_row)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )?;

            for row in rows {
                let cents = to_cents(row.amount)?;
                stmt.execute(params![
                    Uuid::new_v4().to_string(),
                    ingest_id,
                    row.date.format("%Y-%m-%d").to_string(),
                    YearMonth::of_date(row.date).to_string(),
                    cents,
                    cents.abs(),
                    row.merchant,
                    row.description,
                    row.category,
                    row.source,
                    row.raw_row,
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn record_failed_ingest(&self, filename: &str, file_hash: &str, error: &str) -> Result<String> {
        let ingest_id = Uuid::new_v4().to_string();
        warn!(ingest_id = %ingest_id, filename, error, "Ingest failed");
        self.insert_ingest_record(
            &ingest_id,
            filename,
            file_hash,
            0,
            IngestStatus::Failed,
            Some(error),
        )?;
        Ok(ingest_id)
    }

    fn insert_ingest_record(
        &self,
        ingest_id: &str,
        filename: &str,
        file_hash: &str,
        row_count: usize,
        status: IngestStatus,
        error: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO ingests (id, filename, row_count, status, error, file_hash)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
            params![
                ingest_id,
                filename,
                row_count as i64,
                status.as_str(),
                error,
                file_hash
            ],
        )?;
        Ok(())
    }

    /// Most recent ingests first
    pub fn list_ingests(&self, limit: usize) -> Result<Vec<Ingest>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, filename, row_count, status, error, file_hash, created_at
            FROM ingests
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?
            "#,
        )?;
        let ingests = stmt
            .query_map(params![limit as i64], row_to_ingest)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ingests)
    }

    pub fn get_ingest(&self, id: &str) -> Result<Ingest> {
        let conn = self.conn()?;
        conn.query_row(
            r#"
            SELECT id, filename, row_count, status, error, file_hash, created_at
            FROM ingests WHERE id = ?
            "#,
            params![id],
            row_to_ingest,
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("Ingest {}", id)))
    }

    /// Earlier successful ingest of the same file bytes, if any
    pub fn find_ingest_by_hash(&self, file_hash: &str) -> Result<Option<Ingest>> {
        let conn = self.conn()?;
        let ingest = conn
            .query_row(
                r#"
                SELECT id, filename, row_count, status, error, file_hash, created_at
                FROM ingests
                WHERE file_hash = ? AND status = 'success'
                ORDER BY created_at DESC, rowid DESC
                LIMIT 1
                "#,
                params![file_hash],
                row_to_ingest,
            )
            .optional()?;
        Ok(ingest)
    }

    /// Stored transactions of a month in storage order
    pub fn transactions_for_month(&self, month: YearMonth) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT seq, id, ingest_id, date, year_month, amount_cents, abs_amount_cents,
                   merchant, description, category, source, created_at
            FROM transactions
            WHERE year_month = ?
            ORDER BY seq
            "#,
        )?;
        let transactions = stmt
            .query_map(params![month.to_string()], |row| {
                let year_month: String = row.get(4)?;
                let created_at: String = row.get(11)?;
                Ok(Transaction {
                    seq: row.get(0)?,
                    id: row.get(1)?,
                    ingest_id: row.get(2)?,
                    date: date_column(row, 3)?,
                    year_month: year_month.parse().map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            4,
                            rusqlite::types::Type::Text,
                            Box::new(e),
                        )
                    })?,
                    amount: from_cents(row.get(5)?),
                    abs_amount: from_cents(row.get(6)?),
                    merchant: row.get(7)?,
                    description: row.get(8)?,
                    category: row.get(9)?,
                    source: row.get(10)?,
                    created_at: parse_datetime(&created_at),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(transactions)
    }
}

fn row_to_ingest(row: &rusqlite::Row<'_>) -> rusqlite::Result<Ingest> {
    let status: String = row.get(3)?;
    let created_at: String = row.get(6)?;
    Ok(Ingest {
        id: row.get(0)?,
        filename: row.get(1)?,
        row_count: row.get::<_, i64>(2)? as usize,
        status: status.parse().unwrap_or(IngestStatus::Failed),
        error: row.get(4)?,
        file_hash: row.get(5)?,
        created_at: parse_datetime(&created_at),
    })
}
