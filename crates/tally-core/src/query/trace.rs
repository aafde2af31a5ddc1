//! Query trace: the audit record attached to every answer

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use super::intent::Intent;
use crate::db::LedgerFilter;
use crate::month::{MonthSource, YearMonth};

/// How an answer was derived. Present on every response, including
/// clarifications and unknown intents.
#[derive(Debug, Clone, Serialize)]
pub struct QueryTrace {
    pub intent: Intent,
    pub resolved_month: Option<YearMonth>,
    /// Operations in the order they ran
    pub called_functions: Vec<String>,
    pub parameters: Map<String, Value>,
    /// Filter handed to the evidence lookup; `{}` when none ran
    #[serde(serialize_with = "filters_or_empty")]
    pub filters_used: Option<LedgerFilter>,
    pub evidence_count_returned: usize,
    pub notes: Vec<String>,
}

fn filters_or_empty<S: Serializer>(
    filters: &Option<LedgerFilter>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match filters {
        Some(filter) => filter.serialize(serializer),
        None => Map::new().serialize(serializer),
    }
}

/// Accumulates trace entries while the pipeline runs
#[derive(Debug)]
pub struct TraceBuilder {
    trace: QueryTrace,
}

impl Default for TraceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceBuilder {
    pub fn new() -> Self {
        Self {
            trace: QueryTrace {
                intent: Intent::Unknown,
                resolved_month: None,
                called_functions: Vec::new(),
                parameters: Map::new(),
                filters_used: None,
                evidence_count_returned: 0,
                notes: Vec::new(),
            },
        }
    }

    pub fn month(&mut self, month: YearMonth, source: MonthSource) -> &mut Self {
        self.trace.resolved_month = Some(month);
        self.param("month", Value::String(month.to_string()));
        self.param("month_source", Value::String(source.as_str().to_string()));
        self.note(match source {
            MonthSource::Request => "Month provided in request",
            MonthSource::Question => "Month extracted from question",
        })
    }

    pub fn intent(&mut self, intent: Intent) -> &mut Self {
        self.trace.intent = intent;
        self
    }

    pub fn call(&mut self, function: &str) -> &mut Self {
        self.trace.called_functions.push(function.to_string());
        self
    }

    pub fn param(&mut self, key: &str, value: Value) -> &mut Self {
        self.trace.parameters.insert(key.to_string(), value);
        self
    }

    pub fn note(&mut self, note: impl Into<String>) -> &mut Self {
        self.trace.notes.push(note.into());
        self
    }

    /// Close the trace with the evidence lookup that ran, if any
    pub fn finish(mut self, filters: Option<LedgerFilter>, evidence_count: usize) -> QueryTrace {
        self.trace.filters_used = filters;
        self.trace.evidence_count_returned = evidence_count;
        self.trace
    }
}
