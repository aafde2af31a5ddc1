//! Evidence rows: the transactions behind an answer

use super::{date_column, Database, LedgerFilter, Snapshot};
use crate::error::Result;
use crate::models::EvidenceRow;
use crate::money::from_cents;
use crate::month::YearMonth;

impl Snapshot<'_> {
    /// Rows matching `filter`, largest absolute amount first, then newest.
    ///
    /// Remaining ties fall back to storage order.
    pub fn evidence_rows(&self, filter: &LedgerFilter, limit: usize) -> Result<Vec<EvidenceRow>> {
        let built = filter.build();
        let sql = format!(
            r#"
            SELECT t.id, t.date, t.merchant, t.description, t.amount_cents, t.category, t.source
            FROM transactions t
            {}
            ORDER BY t.abs_amount_cents DESC, t.date DESC, t.seq ASC
            LIMIT ?
            "#,
            built.where_clause
        );

        let mut params = built.into_params();
        params.push(Box::new(limit as i64));
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(param_refs.as_slice(), |row| {
                Ok(EvidenceRow {
                    id: row.get(0)?,
                    date: date_column(row, 1)?,
                    merchant: row.get(2)?,
                    description: row.get(3)?,
                    amount: from_cents(row.get(4)?),
                    category: row.get(5)?,
                    source: row.get(6)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
    }
}

impl Database {
    /// Evidence lookup for a month string.
    ///
    /// An invalid month selects nothing; it is not an error here.
    pub fn evidence_rows(
        &self,
        month: &str,
        filter: impl FnOnce(LedgerFilter) -> LedgerFilter,
        limit: usize,
    ) -> Result<Vec<EvidenceRow>> {
        let Ok(month) = month.parse::<YearMonth>() else {
            return Ok(Vec::new());
        };
        let filter = filter(LedgerFilter::new(month));
        self.read_snapshot(|snap| snap.evidence_rows(&filter, limit))
    }
}
