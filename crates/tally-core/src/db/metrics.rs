//! Month-scoped aggregates over the ledger
//!
//! Sums are computed in integer cents by SQLite and surface as two-digit
//! decimals. Empty months yield zero totals, never an error.

use rusqlite::params;

use super::{Database, GroupField, LedgerFilter, Snapshot};
use crate::error::Result;
use crate::models::{GroupSpending, MonthlySummary, MonthlyTotals, SpendTotal};
use crate::money::from_cents;
use crate::month::YearMonth;

impl Snapshot<'_> {
    /// Expense, income and net totals plus the row count for a month
    pub fn monthly_totals(&self, month: YearMonth) -> Result<MonthlyTotals> {
        let (expense, income, net, count): (i64, i64, i64, i64) = self.conn.query_row(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN amount_cents > 0 THEN amount_cents END), 0),
                COALESCE(SUM(CASE WHEN amount_cents < 0 THEN amount_cents END), 0),
                COALESCE(SUM(amount_cents), 0),
                COUNT(*)
            FROM transactions
            WHERE year_month = ?
            "#,
            params![month.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;

        Ok(MonthlyTotals {
            month,
            expense_total: from_cents(expense),
            income_total: from_cents(income),
            net_total: from_cents(net),
            transaction_count: count as u64,
        })
    }

    /// Sum and count of the rows a filter selects
    pub fn filtered_total(&self, filter: &LedgerFilter) -> Result<SpendTotal> {
        let built = filter.build();
        let sql = format!(
            "SELECT COALESCE(SUM(t.amount_cents), 0), COUNT(*) FROM transactions t {}",
            built.where_clause
        );
        let (total, count): (i64, i64) = self
            .conn
            .query_row(&sql, built.params_refs().as_slice(), |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?;

        Ok(SpendTotal {
            expense_total: from_cents(total),
            count: count as u64,
        })
    }

    pub fn category_total(&self, month: YearMonth, category: &str) -> Result<SpendTotal> {
        self.filtered_total(&LedgerFilter::new(month).category(Some(category)))
    }

    pub fn merchant_total(&self, month: YearMonth, merchant: &str) -> Result<SpendTotal> {
        self.filtered_total(&LedgerFilter::new(month).merchant(Some(merchant)))
    }

    pub fn source_total(&self, month: YearMonth, source: &str) -> Result<SpendTotal> {
        self.filtered_total(&LedgerFilter::new(month).source(Some(source)))
    }

    /// Spend per distinct value of `field`, largest first.
    ///
    /// Rows with no value for the field are left out. Equal totals keep the
    /// order in which each group first appears in storage.
    pub fn spend_by(
        &self,
        month: YearMonth,
        field: GroupField,
        limit: Option<usize>,
    ) -> Result<Vec<GroupSpending>> {
        let column = field.column();
        let sql = format!(
            r#"
            SELECT {col}, SUM(t.amount_cents) AS total, COUNT(*)
            FROM transactions t
            WHERE t.year_month = ? AND t.amount_cents > 0
              AND {col} IS NOT NULL AND {col} != ''
            GROUP BY {col}
            ORDER BY total DESC, MIN(t.seq) ASC
            LIMIT ?
            "#,
            col = column
        );
        // SQLite treats a negative LIMIT as no limit
        let limit = limit.map(|l| l as i64).unwrap_or(-1);

        let mut stmt = self.conn.prepare(&sql)?;
        let groups = stmt
            .query_map(params![month.to_string(), limit], |row| {
                Ok(GroupSpending {
                    name: row.get(0)?,
                    expense_total: from_cents(row.get(1)?),
                    count: row.get::<_, i64>(2)? as u64,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(groups)
    }

    /// Merchants by spend, truncated to `k`
    pub fn top_merchants(&self, month: YearMonth, k: usize) -> Result<Vec<GroupSpending>> {
        self.spend_by(month, GroupField::Merchant, Some(k))
    }

    pub fn category_breakdown(&self, month: YearMonth) -> Result<Vec<GroupSpending>> {
        self.spend_by(month, GroupField::Category, None)
    }

    pub fn source_breakdown(&self, month: YearMonth) -> Result<Vec<GroupSpending>> {
        self.spend_by(month, GroupField::Source, None)
    }

    /// Distinct sources used in a month, by name
    pub fn known_sources(&self, month: YearMonth) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT DISTINCT source FROM transactions
            WHERE year_month = ? AND source IS NOT NULL AND source != ''
            ORDER BY source
            "#,
        )?;
        let sources = stmt
            .query_map(params![month.to_string()], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(sources)
    }

    /// Totals plus the three groupings for one month
    pub fn monthly_summary(&self, month: YearMonth, top_k: usize) -> Result<MonthlySummary> {
        Ok(MonthlySummary {
            month,
            totals: self.monthly_totals(month)?,
            by_category: self.category_breakdown(month)?,
            top_merchants: self.top_merchants(month, top_k)?,
            by_source: self.source_breakdown(month)?,
        })
    }
}

impl Database {
    /// Month totals; `month` must be `YYYY-MM`
    pub fn monthly_totals(&self, month: &str) -> Result<MonthlyTotals> {
        let month: YearMonth = month.parse()?;
        self.read_snapshot(|snap| snap.monthly_totals(month))
    }

    pub fn category_total(&self, month: &str, category: &str) -> Result<SpendTotal> {
        let month: YearMonth = month.parse()?;
        self.read_snapshot(|snap| snap.category_total(month, category))
    }

    pub fn merchant_total(&self, month: &str, merchant: &str) -> Result<SpendTotal> {
        let month: YearMonth = month.parse()?;
        self.read_snapshot(|snap| snap.merchant_total(month, merchant))
    }

    pub fn source_total(&self, month: &str, source: &str) -> Result<SpendTotal> {
        let month: YearMonth = month.parse()?;
        self.read_snapshot(|snap| snap.source_total(month, source))
    }

    pub fn top_merchants(&self, month: &str, k: usize) -> Result<Vec<GroupSpending>> {
        let month: YearMonth = month.parse()?;
        self.read_snapshot(|snap| snap.top_merchants(month, k))
    }

    pub fn category_breakdown(&self, month: &str) -> Result<Vec<GroupSpending>> {
        let month: YearMonth = month.parse()?;
        self.read_snapshot(|snap| snap.category_breakdown(month))
    }

    pub fn source_breakdown(&self, month: &str) -> Result<Vec<GroupSpending>> {
        let month: YearMonth = month.parse()?;
        self.read_snapshot(|snap| snap.source_breakdown(month))
    }

    pub fn known_sources(&self, month: &str) -> Result<Vec<String>> {
        let month: YearMonth = month.parse()?;
        self.read_snapshot(|snap| snap.known_sources(month))
    }

    /// Monthly report in one read snapshot
    pub fn monthly_summary(&self, month: &str, top_k: usize) -> Result<MonthlySummary> {
        let month: YearMonth = month.parse()?;
        self.read_snapshot(|snap| snap.monthly_summary(month, top_k))
    }
}
