//! Domain models for Tally

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::month::YearMonth;

/// A normalized CSV row ready for insertion.
///
/// `year_month` and `abs_amount` are not here: the store derives them from
/// `date` and `amount` when the row is written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub date: NaiveDate,
    /// Positive = expense, negative = income or settlement
    pub amount: Decimal,
    pub merchant: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub source: Option<String>,
    /// Original CSV row as JSON
    pub raw_row: Option<String>,
}

/// A stored ledger entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Storage order
    pub seq: i64,
    pub id: String,
    pub ingest_id: String,
    pub date: NaiveDate,
    pub year_month: YearMonth,
    pub amount: Decimal,
    pub abs_amount: Decimal,
    pub merchant: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub source: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Projection of a transaction returned to explain an answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRow {
    pub id: String,
    pub date: NaiveDate,
    pub merchant: Option<String>,
    pub description: Option<String>,
    pub amount: Decimal,
    pub category: Option<String>,
    pub source: Option<String>,
}

/// Outcome of an ingest attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestStatus {
    Success,
    Failed,
}

impl IngestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl std::str::FromStr for IngestStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Unknown ingest status: {}", s)),
        }
    }
}

impl std::fmt::Display for IngestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One row of ingest history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ingest {
    pub id: String,
    pub filename: String,
    pub row_count: usize,
    pub status: IngestStatus,
    pub error: Option<String>,
    /// SHA-256 of the uploaded file
    pub file_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub min: NaiveDate,
    pub max: NaiveDate,
}

/// Result of a successful ingest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestSummary {
    pub ingest_id: String,
    pub row_count: usize,
    pub date_range: Option<DateRange>,
    pub categories_seen: Vec<String>,
    pub sources_seen: Vec<String>,
    pub notes: String,
}

/// Month-wide totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTotals {
    pub month: YearMonth,
    /// Sum of amounts > 0
    pub expense_total: Decimal,
    /// Sum of amounts < 0
    pub income_total: Decimal,
    pub net_total: Decimal,
    pub transaction_count: u64,
}

/// Spend total for one category, merchant, or source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendTotal {
    pub expense_total: Decimal,
    pub count: u64,
}

/// Spend grouped by merchant, category, or source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSpending {
    pub name: String,
    pub expense_total: Decimal,
    pub count: u64,
}

/// Monthly report: totals plus the three groupings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub month: YearMonth,
    pub totals: MonthlyTotals,
    pub by_category: Vec<GroupSpending>,
    pub top_merchants: Vec<GroupSpending>,
    pub by_source: Vec<GroupSpending>,
}
