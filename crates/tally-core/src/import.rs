//! CSV ledger import
//!
//! Expected header: `Date,Amount,Where?,What?,Category,Source`. Extra columns
//! are kept in the raw row but otherwise ignored.

use chrono::{NaiveDate, Weekday};
use csv::{ReaderBuilder, StringRecord};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::io::Read;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::NewTransaction;
use crate::money;

/// Columns every ledger export must carry (case sensitive)
pub const REQUIRED_COLUMNS: [&str; 6] = ["Date", "Amount", "Where?", "What?", "Category", "Source"];

/// Date format used by the ledger export, e.g. `Sat, 24 Jun 2025`
pub const DATE_FORMAT: &str = "%a, %d %b %Y";

/// Column positions resolved from the header row
struct Columns {
    date: usize,
    amount: usize,
    merchant: usize,
    description: usize,
    category: usize,
    source: usize,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|c| find(c).is_none())
            .collect();
        if !missing.is_empty() {
            let found: Vec<&str> = headers.iter().collect();
            return Err(Error::Import(format!(
                "Missing required columns: {}. Found columns: {}",
                missing.join(", "),
                found.join(", ")
            )));
        }

        let position = |name: &str| {
            find(name).ok_or_else(|| Error::Import(format!("Missing column: {}", name)))
        };
        Ok(Self {
            date: position("Date")?,
            amount: position("Amount")?,
            merchant: position("Where?")?,
            description: position("What?")?,
            category: position("Category")?,
            source: position("Source")?,
        })
    }
}

/// Convert a CSV record to a JSON object using headers as keys
fn record_to_json(headers: &StringRecord, record: &StringRecord) -> String {
    let mut map = serde_json::Map::new();
    for (i, header) in headers.iter().enumerate() {
        if let Some(value) = record.get(i) {
            map.insert(header.to_string(), Value::String(value.to_string()));
        }
    }
    json!(map).to_string()
}

fn optional_cell(record: &StringRecord, index: usize) -> Option<String> {
    record
        .get(index)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Parse a ledger CSV into normalized rows.
///
/// Fails on the first bad row; nothing is partially returned.
pub fn parse_csv<R: Read>(reader: R) -> Result<Vec<NewTransaction>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let columns = Columns::from_headers(&headers)?;
    let mut transactions = Vec::new();

    for (index, result) in rdr.records().enumerate() {
        let row_number = index + 1;
        let record = result?;
        let raw_row = record_to_json(&headers, &record);

        let row_error = |e: Error| {
            let reason = match e {
                Error::Import(msg) => msg,
                other => other.to_string(),
            };
            Error::Import(format!("Row {}: {} (row: {})", row_number, reason, raw_row))
        };

        let date = parse_date(record.get(columns.date).unwrap_or("")).map_err(row_error)?;
        let amount =
            money::parse_amount(record.get(columns.amount).unwrap_or("")).map_err(row_error)?;

        transactions.push(NewTransaction {
            date,
            amount,
            merchant: optional_cell(&record, columns.merchant),
            description: optional_cell(&record, columns.description),
            category: optional_cell(&record, columns.category),
            source: optional_cell(&record, columns.source),
            raw_row: Some(raw_row),
        });
    }

    debug!("Parsed {} ledger rows", transactions.len());
    Ok(transactions)
}

/// Parse a ledger date such as `Sat, 24 Jun 2025`.
///
/// The weekday must be a weekday name but is not checked against the date;
/// exports are known to carry stale weekday labels.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    let invalid = || {
        Error::Import(format!(
            "Unable to parse date '{}'. Expected format like 'Sat, 24 Jun 2025' ({})",
            s, DATE_FORMAT
        ))
    };
    if s.is_empty() {
        return Err(Error::Import(format!(
            "Empty date. Expected format like 'Sat, 24 Jun 2025' ({})",
            DATE_FORMAT
        )));
    }

    let (weekday, rest) = s.split_once(',').ok_or_else(invalid)?;
    weekday.trim().parse::<Weekday>().map_err(|_| invalid())?;
    NaiveDate::parse_from_str(rest.trim(), "%d %b %Y").map_err(|_| invalid())
}

/// SHA-256 fingerprint of an uploaded file, hex encoded
pub fn file_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
