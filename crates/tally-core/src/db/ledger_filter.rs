//! Ledger filter builder shared by metrics and evidence lookups
//!
//! An answer's totals and its evidence rows are computed from the same
//! `LedgerFilter`, so the two can never disagree about which rows matter.

use serde::{Deserialize, Serialize};

use crate::month::YearMonth;

/// Which side of the sign convention a filter selects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmountKind {
    /// amount > 0
    #[default]
    Expense,
    /// amount < 0
    Income,
}

impl AmountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Income => "income",
        }
    }

    fn condition(&self) -> &'static str {
        match self {
            Self::Expense => "t.amount_cents > 0",
            Self::Income => "t.amount_cents < 0",
        }
    }
}

/// Fields spend can be grouped by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupField {
    Merchant,
    Category,
    Source,
}

impl GroupField {
    pub(crate) fn column(&self) -> &'static str {
        match self {
            Self::Merchant => "t.merchant",
            Self::Category => "t.category",
            Self::Source => "t.source",
        }
    }
}

/// Month-scoped filter with exact-match entity constraints
///
/// Entity values are compared case-sensitively; callers pass canonical
/// stored spellings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerFilter {
    pub month: YearMonth,
    pub kind: AmountKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant: Option<String>,
}

/// Result of building a filter - contains SQL components and parameters
pub struct FilterResult {
    /// WHERE clause including "WHERE" keyword
    pub where_clause: String,
    /// Parameters for the query (boxed for rusqlite compatibility)
    pub params: Vec<Box<dyn rusqlite::ToSql>>,
}

impl LedgerFilter {
    /// Expense rows of `month`
    pub fn new(month: YearMonth) -> Self {
        Self {
            month,
            kind: AmountKind::Expense,
            category: None,
            source: None,
            merchant: None,
        }
    }

    pub fn kind(mut self, kind: AmountKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn category(mut self, category: Option<&str>) -> Self {
        self.category = category.map(str::to_string);
        self
    }

    pub fn source(mut self, source: Option<&str>) -> Self {
        self.source = source.map(str::to_string);
        self
    }

    pub fn merchant(mut self, merchant: Option<&str>) -> Self {
        self.merchant = merchant.map(str::to_string);
        self
    }

    /// Build the filter components
    pub fn build(&self) -> FilterResult {
        let mut conditions = vec!["t.year_month = ?".to_string(), self.kind.condition().to_string()];
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(self.month.to_string())];

        for (column, value) in [
            ("t.category", &self.category),
            ("t.source", &self.source),
            ("t.merchant", &self.merchant),
        ] {
            if let Some(value) = value {
                conditions.push(format!("{} = ?", column));
                params.push(Box::new(value.clone()));
            }
        }

        FilterResult {
            where_clause: format!("WHERE {}", conditions.join(" AND ")),
            params,
        }
    }
}

impl FilterResult {
    /// Get parameter references for query execution
    pub fn params_refs(&self) -> Vec<&dyn rusqlite::ToSql> {
        self.params.iter().map(|p| p.as_ref()).collect()
    }

    /// Take the parameters to append a LIMIT
    pub fn into_params(self) -> Vec<Box<dyn rusqlite::ToSql>> {
        self.params
    }
}
