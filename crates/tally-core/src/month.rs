//! Year-month values and month resolution from free text
//!
//! A month is always written `YYYY-MM`. Questions may also name a month in
//! prose ("May 2025", "sept, 2024"), which [`extract_from_text`] understands.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

static ISO_MONTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}$").expect("valid regex"));

static ISO_MONTH_IN_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4}-\d{2})\b").expect("valid regex"));

static NAMED_MONTH_IN_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(january|february|march|april|may|june|july|august|september|october|november|december|jan|feb|mar|apr|jun|jul|aug|sept|sep|oct|nov|dec)\b,?\s*(\d{4})\b",
    )
    .expect("valid regex")
});

/// Why a month string was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidMonth {
    #[error("Invalid month format '{0}'. Expected format: 'YYYY-MM' (e.g., '2025-05')")]
    Format(String),

    #[error("Invalid month '{0}'. Month must be between 01-12")]
    OutOfRange(String),
}

/// A calendar month, the scope of every ledger query
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> std::result::Result<Self, InvalidMonth> {
        if !(1..=12).contains(&month) || !(0..=9999).contains(&year) {
            return Err(InvalidMonth::OutOfRange(format!("{:04}-{:02}", year, month)));
        }
        Ok(Self { year, month })
    }

    /// The month a date falls in
    pub fn of_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }
}

impl FromStr for YearMonth {
    type Err = InvalidMonth;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if !ISO_MONTH.is_match(s) {
            return Err(InvalidMonth::Format(s.to_string()));
        }
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| InvalidMonth::Format(s.to_string()))?;
        let year: i32 = year
            .parse()
            .map_err(|_| InvalidMonth::Format(s.to_string()))?;
        let month: u32 = month
            .parse()
            .map_err(|_| InvalidMonth::Format(s.to_string()))?;
        if !(1..=12).contains(&month) {
            return Err(InvalidMonth::OutOfRange(s.to_string()));
        }
        Ok(Self { year, month })
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

fn month_number(name: &str) -> Option<u32> {
    let n = match name.to_lowercase().as_str() {
        "january" | "jan" => 1,
        "february" | "feb" => 2,
        "march" | "mar" => 3,
        "april" | "apr" => 4,
        "may" => 5,
        "june" | "jun" => 6,
        "july" | "jul" => 7,
        "august" | "aug" => 8,
        "september" | "sept" | "sep" => 9,
        "october" | "oct" => 10,
        "november" | "nov" => 11,
        "december" | "dec" => 12,
        _ => return None,
    };
    Some(n)
}

/// Find a month mentioned in free text.
///
/// A literal `YYYY-MM` token wins over a month name. Tokens that look like a
/// month but fail validation (`2025-13`) are skipped rather than reported.
pub fn extract_from_text(text: &str) -> Option<YearMonth> {
    for caps in ISO_MONTH_IN_TEXT.captures_iter(text) {
        if let Ok(month) = caps[1].parse() {
            return Some(month);
        }
    }

    for caps in NAMED_MONTH_IN_TEXT.captures_iter(text) {
        let Some(month) = month_number(&caps[1]) else {
            continue;
        };
        let Ok(year) = caps[2].parse::<i32>() else {
            continue;
        };
        if let Ok(ym) = YearMonth::new(year, month) {
            return Some(ym);
        }
    }

    None
}

/// Where the analysis month came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonthSource {
    Request,
    Question,
}

impl MonthSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MonthSource::Request => "request",
            MonthSource::Question => "question",
        }
    }
}

/// Outcome of month resolution for one question
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonthResolution {
    Resolved(YearMonth, MonthSource),
    /// The caller supplied a month and it did not validate
    Invalid(InvalidMonth),
    /// Nothing in the request or the question names a month
    Missing,
}

/// Resolve the analysis month: an explicit value wins, otherwise the question text.
pub fn resolve(explicit: Option<&str>, question: &str) -> MonthResolution {
    match explicit.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => match raw.parse() {
            Ok(month) => MonthResolution::Resolved(month, MonthSource::Request),
            Err(e) => MonthResolution::Invalid(e),
        },
        None => match extract_from_text(question) {
            Some(month) => MonthResolution::Resolved(month, MonthSource::Question),
            None => MonthResolution::Missing,
        },
    }
}
