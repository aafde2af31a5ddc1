//! Intent classification
//!
//! Keyword signals overlap ("category" shows up in breakdown and total
//! questions alike), so intents are decided by an ordered rule table. The
//! first rule whose predicate holds wins; the order is the behavior.

use serde::{Deserialize, Serialize};

use super::entities;

/// What a question is asking for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    MonthlySummary,
    CategoryTotal,
    MerchantTotal,
    SourceTotal,
    TopMerchants,
    CategoryBreakdown,
    SourceBreakdown,
    Unknown,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MonthlySummary => "monthly_summary",
            Self::CategoryTotal => "category_total",
            Self::MerchantTotal => "merchant_total",
            Self::SourceTotal => "source_total",
            Self::TopMerchants => "top_merchants",
            Self::CategoryBreakdown => "category_breakdown",
            Self::SourceBreakdown => "source_breakdown",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

const SUPERLATIVES: [&str; 5] = ["most", "highest", "max", "maximum", "largest"];

const SPEND_KEYWORDS: [&str; 7] = ["spent", "spend", "expense", "expenses", "total", "net", "overall"];

/// Everything a rule may look at
pub struct IntentContext<'a> {
    pub lower: String,
    pub categories: &'a [String],
    pub known_sources: &'a [String],
    pub month_resolved: bool,
}

impl<'a> IntentContext<'a> {
    pub fn new(
        question: &str,
        categories: &'a [String],
        known_sources: &'a [String],
        month_resolved: bool,
    ) -> Self {
        Self {
            lower: question.to_lowercase(),
            categories,
            known_sources,
            month_resolved,
        }
    }

    fn has(&self, needle: &str) -> bool {
        self.lower.contains(needle)
    }

    fn has_word(&self, word: &str) -> bool {
        entities::contains_phrase(&self.lower, word)
    }
}

/// One row of the rule table
pub struct IntentRule {
    pub intent: Intent,
    pub name: &'static str,
    pub matches: fn(&IntentContext<'_>) -> bool,
}

/// Rules in priority order
pub const RULES: &[IntentRule] = &[
    IntentRule {
        intent: Intent::TopMerchants,
        name: "top_with_merchant_or_where",
        matches: top_merchants,
    },
    IntentRule {
        intent: Intent::CategoryBreakdown,
        name: "category_breakdown_or_superlative",
        matches: category_breakdown,
    },
    IntentRule {
        intent: Intent::SourceBreakdown,
        name: "source_breakdown",
        matches: source_breakdown,
    },
    IntentRule {
        intent: Intent::SourceTotal,
        name: "linking_preposition_source",
        matches: source_total,
    },
    IntentRule {
        intent: Intent::CategoryTotal,
        name: "known_category_or_category_keyword",
        matches: category_total,
    },
    IntentRule {
        intent: Intent::MerchantTotal,
        name: "quoted_or_at_on_merchant",
        matches: merchant_total,
    },
    IntentRule {
        intent: Intent::MonthlySummary,
        name: "month_with_spend_keyword",
        matches: monthly_summary,
    },
];

fn top_merchants(ctx: &IntentContext<'_>) -> bool {
    ctx.has("top") && (ctx.has("merchant") || ctx.has("where"))
}

fn category_breakdown(ctx: &IntentContext<'_>) -> bool {
    ctx.has("category")
        && (ctx.has("breakdown") || SUPERLATIVES.iter().any(|w| ctx.has_word(w)))
}

fn source_breakdown(ctx: &IntentContext<'_>) -> bool {
    ctx.has("breakdown") && ctx.has("source")
}

fn source_total(ctx: &IntentContext<'_>) -> bool {
    entities::has_linking_preposition(&ctx.lower)
        && (entities::anchored_source(&ctx.lower, ctx.known_sources).is_some()
            || entities::preposition_phrase(&ctx.lower).is_some())
}

fn category_total(ctx: &IntentContext<'_>) -> bool {
    ctx.has("category")
        || ctx
            .categories
            .iter()
            .any(|c| ctx.has_word(&c.to_lowercase()))
}

fn merchant_total(ctx: &IntentContext<'_>) -> bool {
    // "using Cash" names a source, never a merchant
    !entities::has_linking_preposition(&ctx.lower)
        && entities::names_merchant(&ctx.lower, ctx.categories)
}

fn monthly_summary(ctx: &IntentContext<'_>) -> bool {
    ctx.month_resolved && SPEND_KEYWORDS.iter().any(|k| ctx.has(k))
}

/// Intent plus the rule that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub intent: Intent,
    /// Name of the matching rule, `"fallback"` for unknown
    pub rule: &'static str,
}

/// Run the rule table over a question
pub fn classify(ctx: &IntentContext<'_>) -> Classification {
    RULES
        .iter()
        .find(|rule| (rule.matches)(ctx))
        .map(|rule| Classification {
            intent: rule.intent,
            rule: rule.name,
        })
        .unwrap_or(Classification {
            intent: Intent::Unknown,
            rule: "fallback",
        })
}

/// Classify a question for a month whose sources are `known_sources`
pub fn classify_intent(
    question: &str,
    categories: &[String],
    known_sources: &[String],
    month_resolved: bool,
) -> Intent {
    classify(&IntentContext::new(
        question,
        categories,
        known_sources,
        month_resolved,
    ))
    .intent
}
