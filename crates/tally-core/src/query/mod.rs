//! Question answering over the ledger
//!
//! A question flows through: month resolution, known-source lookup, intent
//! classification, entity extraction, metric computation and evidence
//! selection. All reads for one question share a single snapshot, and the
//! metric and its evidence are driven by the same [`LedgerFilter`].
//!
//! Unresolvable input never fails the request: a missing or malformed month
//! or entity becomes a clarifying question, and an unrecognized question gets
//! a help message. Only store failures surface as errors.

pub mod entities;
pub mod intent;
pub mod trace;

use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::json;
use tracing::debug;

use crate::config::TallyConfig;
use crate::db::{Database, LedgerFilter, Snapshot};
use crate::error::Result;
use crate::models::{EvidenceRow, GroupSpending, SpendTotal};
use crate::money::format_currency;
use crate::month::{self, MonthResolution, MonthSource, YearMonth};

pub use intent::{Classification, Intent};
pub use trace::{QueryTrace, TraceBuilder};

pub const MONTH_QUESTION: &str = "Please specify a month in YYYY-MM format (e.g., 2025-05).";
pub const CATEGORY_QUESTION: &str =
    "Which category are you interested in? (e.g., Food, Travel, Essentials)";
pub const MERCHANT_QUESTION: &str =
    "Which merchant or store are you asking about? (e.g., 'at Target' or 'Uber')";
pub const SOURCE_QUESTION: &str =
    "Which source are you interested in? Please specify the payment source.";
pub const HELP_TEXT: &str = "I can help you with questions about your spending. \
    Supported question types include: monthly summaries, category totals, merchant totals, \
    source totals, top merchants, and category/source breakdowns. \
    Please rephrase your question with a specific month (YYYY-MM format).";

static TOP_N: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\btop\s+(\d{1,4})\b").expect("valid regex"));

/// A question about the ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    /// `YYYY-MM`; overrides any month in the question
    #[serde(default)]
    pub month: Option<String>,
    /// Evidence rows to return; the configured default when absent
    #[serde(default)]
    pub limit_evidence: Option<i64>,
}

impl QueryRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            month: None,
            limit_evidence: None,
        }
    }

    pub fn month(mut self, month: impl Into<String>) -> Self {
        self.month = Some(month.into());
        self
    }

    pub fn limit_evidence(mut self, limit: i64) -> Self {
        self.limit_evidence = Some(limit);
        self
    }
}

/// A value in the `numbers` map: exact decimal (as a string) or a count
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum NumberValue {
    Amount(Decimal),
    Count(u64),
}

/// Computed values in the order they were produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Numbers(Vec<(String, NumberValue)>);

impl Numbers {
    pub fn amount(mut self, key: impl Into<String>, value: Decimal) -> Self {
        self.0.push((key.into(), NumberValue::Amount(value)));
        self
    }

    pub fn count(mut self, key: impl Into<String>, value: u64) -> Self {
        self.0.push((key.into(), NumberValue::Count(value)));
        self
    }

    pub fn get(&self, key: &str) -> Option<&NumberValue> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NumberValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Numbers {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Answer, numbers, evidence and trace for one question
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub final_answer: Option<String>,
    pub clarifying_question: Option<String>,
    pub numbers: Option<Numbers>,
    pub evidence: Vec<EvidenceRow>,
    pub trace: QueryTrace,
}

/// Answer text and numbers for one resolved intent
#[derive(Default)]
struct Outcome {
    final_answer: Option<String>,
    clarifying_question: Option<String>,
    numbers: Option<Numbers>,
}

impl Outcome {
    fn answer(text: String, numbers: Option<Numbers>) -> Self {
        Self {
            final_answer: Some(text),
            numbers,
            ..Default::default()
        }
    }

    fn clarify(question: &str) -> Self {
        Self {
            clarifying_question: Some(question.to_string()),
            ..Default::default()
        }
    }
}

/// Answers questions against one ledger with one vocabulary
pub struct QueryEngine<'a> {
    db: &'a Database,
    config: &'a TallyConfig,
}

impl<'a> QueryEngine<'a> {
    pub fn new(db: &'a Database, config: &'a TallyConfig) -> Self {
        Self { db, config }
    }

    pub fn answer(&self, request: &QueryRequest) -> Result<QueryResponse> {
        let limit = request
            .limit_evidence
            .unwrap_or(self.config.default_evidence_limit as i64)
            .clamp(1, self.config.max_evidence_limit as i64) as usize;
        let mut trace = TraceBuilder::new();

        match month::resolve(request.month.as_deref(), &request.question) {
            MonthResolution::Missing => {
                trace.note("No month in request or question");
                debug!("No month resolved; asking for one");
                Ok(clarification(MONTH_QUESTION.to_string(), trace))
            }
            MonthResolution::Invalid(err) => {
                trace.note(err.to_string());
                debug!(error = %err, "Rejected explicit month");
                Ok(clarification(format!("{}. {}", err, MONTH_QUESTION), trace))
            }
            MonthResolution::Resolved(month, source) => self.db.read_snapshot(|snap| {
                self.answer_for_month(snap, &request.question, month, source, limit, trace)
            }),
        }
    }

    fn answer_for_month(
        &self,
        snap: &Snapshot<'_>,
        question: &str,
        month: YearMonth,
        month_source: MonthSource,
        limit: usize,
        mut trace: TraceBuilder,
    ) -> Result<QueryResponse> {
        let categories = &self.config.known_categories;
        trace.month(month, month_source);

        trace.call("list_known_sources");
        let known_sources = snap.known_sources(month)?;
        trace
            .param("known_categories", json!(categories))
            .param("known_sources", json!(known_sources));

        trace.call("classify_intent");
        let classification = intent::classify(&intent::IntentContext::new(
            question,
            categories,
            &known_sources,
            true,
        ));
        trace
            .intent(classification.intent)
            .note(format!("Intent matched rule: {}", classification.rule));
        debug!(
            %month,
            intent = %classification.intent,
            rule = classification.rule,
            "Classified question"
        );

        let mut filter = LedgerFilter::new(month);
        let outcome = match classification.intent {
            Intent::MonthlySummary => {
                trace.call("monthly_totals");
                let totals = snap.monthly_totals(month)?;
                let numbers = Numbers::default()
                    .amount("expense_total", totals.expense_total)
                    .amount("income_total", totals.income_total)
                    .amount("net_total", totals.net_total)
                    .count("transaction_count", totals.transaction_count);
                Outcome::answer(
                    format!(
                        "In {}, you spent {} across {} transactions. Net total: {}.",
                        month,
                        format_currency(totals.expense_total),
                        totals.transaction_count,
                        format_currency(totals.net_total)
                    ),
                    Some(numbers),
                )
            }
            Intent::CategoryTotal => {
                trace.call("extract_category");
                match entities::extract_category(question, categories) {
                    Some(category) => {
                        filter = filter.category(Some(&category));
                        entity_total(snap, &filter, &mut trace, "category", &category, "on")?
                    }
                    None => {
                        trace.note("Category could not be extracted from question");
                        Outcome::clarify(CATEGORY_QUESTION)
                    }
                }
            }
            Intent::MerchantTotal => {
                trace.call("extract_merchant");
                match entities::extract_merchant(question, categories) {
                    Some(merchant) => {
                        filter = filter.merchant(Some(&merchant));
                        entity_total(snap, &filter, &mut trace, "merchant", &merchant, "at")?
                    }
                    None => {
                        trace.note("Merchant could not be extracted from question");
                        Outcome::clarify(MERCHANT_QUESTION)
                    }
                }
            }
            Intent::SourceTotal => {
                trace.call("extract_source");
                match entities::extract_source(question, &known_sources) {
                    Some(source) => {
                        filter = filter.source(Some(&source));
                        entity_total(snap, &filter, &mut trace, "source", &source, "using")?
                    }
                    None => {
                        trace.note("Source could not be extracted from question");
                        Outcome::clarify(SOURCE_QUESTION)
                    }
                }
            }
            Intent::TopMerchants => {
                let k = self.top_k(question, &mut trace);
                trace.call("top_merchants").param("k", json!(k));
                let merchants = snap.top_merchants(month, k)?;
                grouped_answer(&merchants, "merchant", month, |g| {
                    format!("{} ({})", g.name, format_currency(g.expense_total))
                })
            }
            Intent::CategoryBreakdown => {
                trace.call("category_breakdown");
                let groups = snap.category_breakdown(month)?;
                grouped_answer(&groups, "category", month, name_colon_amount)
            }
            Intent::SourceBreakdown => {
                trace.call("source_breakdown");
                let groups = snap.source_breakdown(month)?;
                grouped_answer(&groups, "source", month, name_colon_amount)
            }
            Intent::Unknown => {
                trace.note("Question did not match a supported question type");
                Outcome::answer(HELP_TEXT.to_string(), None)
            }
        };

        trace.call("evidence_rows");
        let evidence = snap.evidence_rows(&filter, limit)?;

        Ok(QueryResponse {
            final_answer: outcome.final_answer,
            clarifying_question: outcome.clarifying_question,
            numbers: outcome.numbers,
            trace: trace.finish(Some(filter), evidence.len()),
            evidence,
        })
    }

    /// `k` for a top-merchants question: "top N" if given and in range
    fn top_k(&self, question: &str, trace: &mut TraceBuilder) -> usize {
        let requested = TOP_N
            .captures(question)
            .and_then(|caps| caps[1].parse::<usize>().ok());
        match requested {
            Some(n) if (1..=self.config.max_top_k).contains(&n) => n,
            Some(n) => {
                trace.note(format!(
                    "Requested top {} is outside 1-{}; using {}",
                    n, self.config.max_top_k, self.config.default_top_k
                ));
                self.config.default_top_k
            }
            None => self.config.default_top_k,
        }
    }
}

fn clarification(question: String, trace: TraceBuilder) -> QueryResponse {
    QueryResponse {
        final_answer: None,
        clarifying_question: Some(question),
        numbers: None,
        evidence: Vec::new(),
        trace: trace.finish(None, 0),
    }
}

/// Total for one resolved entity, computed from the filter evidence will use
fn entity_total(
    snap: &Snapshot<'_>,
    filter: &LedgerFilter,
    trace: &mut TraceBuilder,
    entity: &str,
    value: &str,
    preposition: &str,
) -> Result<Outcome> {
    let metric = format!("{}_total", entity);
    trace
        .param(entity, json!(value))
        .note(format!("{} extracted from question", capitalize(entity)))
        .call(&metric);

    let SpendTotal {
        expense_total,
        count,
    } = snap.filtered_total(filter)?;
    let numbers = Numbers::default()
        .amount("expense_total", expense_total)
        .count("count", count);

    Ok(Outcome::answer(
        format!(
            "You spent {} {} {} in {} across {} transactions.",
            format_currency(expense_total),
            preposition,
            value,
            filter.month,
            count
        ),
        Some(numbers),
    ))
}

fn name_colon_amount(group: &GroupSpending) -> String {
    format!("{}: {}", group.name, format_currency(group.expense_total))
}

/// Answer listing the first three groups; numbers carry every group
fn grouped_answer(
    groups: &[GroupSpending],
    noun: &str,
    month: YearMonth,
    describe: impl Fn(&GroupSpending) -> String,
) -> Outcome {
    if groups.is_empty() {
        return Outcome::answer(format!("No {} data found for {}.", noun, month), None);
    }
    let heading = match noun {
        "merchant" => format!("Top merchants in {}", month),
        _ => format!("{} breakdown for {}", capitalize(noun), month),
    };
    let listed: Vec<String> = groups.iter().take(3).map(describe).collect();
    let numbers = groups
        .iter()
        .fold(Numbers::default(), |n, g| n.amount(g.name.clone(), g.expense_total));
    Outcome::answer(format!("{}: {}", heading, listed.join(", ")), Some(numbers))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
