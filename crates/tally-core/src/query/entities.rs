//! Category, merchant and source extraction from question text

use std::sync::LazyLock;

use regex::Regex;

/// Trailing words dropped from a source span
const SOURCE_STOP_WORDS: [&str; 8] = ["in", "for", "during", "this", "last", "on", "at", "the"];

/// Words that end a source span
const SOURCE_SPAN_BOUNDARIES: [&str; 7] = ["in", "for", "during", "this", "last", "on", "at"];

/// Words that tie a payment source to the spend ("using Cash", "via Amex")
static PREPOSITION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:using|via|with|from)\b").expect("valid regex"));

/// 1-3 alphabetic words after a linking preposition
static PREPOSITION_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:using|via|with|from)\s+([a-z]+(?:\s+[a-z]+){0,2})").expect("valid regex")
});

static DOUBLE_QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]+)""#).expect("valid regex"));

/// Single quotes, but not apostrophes inside words ("I'm", "Trader Joe's")
static SINGLE_QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^\w])'([^']+)'(?:[^\w]|$)").expect("valid regex"));

static AT_OR_ON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:at|on)\s+").expect("valid regex"));

/// Words following "at"/"on", up to the first non-word character
static AT_OR_ON_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:at|on)\s+(\w+(?:\s+\w+)*)").expect("valid regex")
});

static MERCHANT_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:in|for|during|this|last)\b|\d{4}-\d{2}").expect("valid regex")
});

static ISO_MONTH_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}$").expect("valid regex"));

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Whole-word (or whole-phrase) containment. Both sides must already be
/// lower-cased.
pub(crate) fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    if phrase.is_empty() {
        return false;
    }
    haystack.match_indices(phrase).any(|(start, _)| {
        let end = start + phrase.len();
        let before = haystack[..start].chars().next_back();
        let after = haystack[end..].chars().next();
        !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
    })
}

/// Does the question use any linking preposition as a word?
pub(crate) fn has_linking_preposition(lower: &str) -> bool {
    PREPOSITION.is_match(lower)
}

/// First known category named in the question.
///
/// Categories are tried in vocabulary order, so "Food and Travel" yields
/// whichever of the two is listed first, not whichever is written first.
pub fn extract_category(question: &str, categories: &[String]) -> Option<String> {
    let lower = question.to_lowercase();
    categories
        .iter()
        .find(|c| contains_phrase(&lower, &c.to_lowercase()))
        .cloned()
}

fn clean_merchant(span: &str) -> String {
    let stripped: String = span
        .chars()
        .filter(|c| is_word_char(*c) || c.is_whitespace())
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn quoted_phrase(question: &str) -> Option<&str> {
    DOUBLE_QUOTED
        .captures(question)
        .or_else(|| SINGLE_QUOTED.captures(question))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Does the question point at a merchant: a quoted phrase or words after
/// "at"/"on" that are not a known category?
///
/// Looser than [`extract_merchant`]: "spent on 2025-06" points at something
/// even though no merchant can be read from it.
pub(crate) fn names_merchant(question: &str, categories: &[String]) -> bool {
    let phrase = quoted_phrase(question).or_else(|| {
        AT_OR_ON_WORDS
            .captures(question)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    });
    phrase
        .map(str::trim)
        .is_some_and(|p| !p.is_empty() && !categories.iter().any(|c| c.eq_ignore_ascii_case(p)))
}

/// Merchant named in the question, as typed.
///
/// A quoted phrase wins; otherwise the text after "at"/"on" up to a time
/// word or a `YYYY-MM` token. Known category names are never merchants.
pub fn extract_merchant(question: &str, categories: &[String]) -> Option<String> {
    let merchant = match quoted_phrase(question) {
        Some(quoted) => clean_merchant(quoted),
        None => AT_OR_ON
            .find_iter(question)
            .map(|m| {
                let rest = &question[m.end()..];
                let end = MERCHANT_BOUNDARY
                    .find(rest)
                    .map(|b| b.start())
                    .unwrap_or(rest.len());
                clean_merchant(&rest[..end])
            })
            .find(|span| !span.is_empty())?,
    };

    if merchant.is_empty() || categories.iter().any(|c| c.eq_ignore_ascii_case(&merchant)) {
        return None;
    }
    Some(merchant)
}

fn strip_trailing_stop_words(words: &mut Vec<&str>) {
    while words
        .last()
        .is_some_and(|w| SOURCE_STOP_WORDS.contains(w))
    {
        words.pop();
    }
}

/// The words a preposition points at: up to punctuation, a time word, or a
/// month token, minus trailing stop words. Input is lower-cased.
fn anchored_span(rest: &str) -> String {
    let cut = rest
        .find(|c| matches!(c, '?' | '!' | ',' | '.' | ';' | ':' | '"'))
        .unwrap_or(rest.len());

    let mut words = Vec::new();
    for word in rest[..cut].split_whitespace() {
        if SOURCE_SPAN_BOUNDARIES.contains(&word) || ISO_MONTH_TOKEN.is_match(word) {
            break;
        }
        words.push(word);
    }
    strip_trailing_stop_words(&mut words);
    words.join(" ")
}

/// Longest known source contained in `text` at word boundaries; ties go to
/// the earlier entry.
fn longest_contained<'a>(text: &str, known_sources: &'a [String]) -> Option<&'a str> {
    let mut best: Option<&'a str> = None;
    for source in known_sources {
        if contains_phrase(text, &source.to_lowercase())
            && best.map_or(true, |b| source.len() > b.len())
        {
            best = Some(source);
        }
    }
    best
}

/// Match a preposition span against known sources: exact first, then containment
fn match_span(span: &str, known_sources: &[String]) -> Option<String> {
    if span.is_empty() {
        return None;
    }
    known_sources
        .iter()
        .find(|s| s.to_lowercase() == span)
        .map(|s| s.as_str())
        .or_else(|| longest_contained(span, known_sources))
        .map(str::to_string)
}

/// Known source a preposition in the question points at, in canonical casing
pub(crate) fn anchored_source(lower: &str, known_sources: &[String]) -> Option<String> {
    PREPOSITION
        .find_iter(lower)
        .find_map(|m| match_span(&anchored_span(&lower[m.end()..]), known_sources))
}

/// Loose fallback: does a preposition introduce some alphabetic phrase?
pub(crate) fn preposition_phrase(lower: &str) -> Option<String> {
    PREPOSITION_WORDS.captures_iter(lower).find_map(|caps| {
        let mut words: Vec<&str> = caps.get(1)?.as_str().split_whitespace().collect();
        strip_trailing_stop_words(&mut words);
        (!words.is_empty()).then(|| words.join(" "))
    })
}

/// Payment source named in the question, always in stored casing.
///
/// Looks after linking prepositions first, then anywhere in the question.
pub fn extract_source(question: &str, known_sources: &[String]) -> Option<String> {
    let lower = question.to_lowercase();
    anchored_source(&lower, known_sources)
        .or_else(|| longest_contained(&lower, known_sources).map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn categories() -> Vec<String> {
        strings(&["Travel", "Essentials", "Food", "Personal", "Home", "Others"])
    }

    #[test]
    fn test_contains_phrase_respects_boundaries() {
        assert!(contains_phrase("spent on food in may", "food"));
        assert!(!contains_phrase("spent on seafood", "food"));
        assert!(!contains_phrase("foods", "food"));
        assert!(contains_phrase("paid with credit card.", "credit card"));
        assert!(!contains_phrase("anything", ""));
    }

    #[test]
    fn test_extract_category() {
        assert_eq!(
            extract_category("How much did I spend on FOOD in 2025-05?", &categories()),
            Some("Food".into())
        );
        assert_eq!(extract_category("seafood dinner", &categories()), None);
    }

    #[test]
    fn test_extract_category_vocabulary_order_wins() {
        // Food is written first but Travel is listed first
        assert_eq!(
            extract_category("food and travel in 2025-05", &categories()),
            Some("Travel".into())
        );
    }

    #[test]
    fn test_extract_category_alternate_vocabulary() {
        let vocab = strings(&["Groceries"]);
        assert_eq!(
            extract_category("spend on groceries", &vocab),
            Some("Groceries".into())
        );
        assert_eq!(extract_category("spend on Food", &vocab), None);
    }

    #[test]
    fn test_extract_merchant_after_at() {
        assert_eq!(
            extract_merchant("How much did I spend at Target in 2025-06?", &categories()),
            Some("Target".into())
        );
        assert_eq!(
            extract_merchant("spent at Whole Foods Market last month", &categories()),
            Some("Whole Foods Market".into())
        );
        assert_eq!(
            extract_merchant("spend on Uber 2025-06", &categories()),
            Some("Uber".into())
        );
        assert_eq!(
            extract_merchant("spend at Trader Joe's?", &categories()),
            Some("Trader Joes".into())
        );
    }

    #[test]
    fn test_extract_merchant_quoted() {
        assert_eq!(
            extract_merchant("How much went to \"Blue Bottle\" in 2025-06", &categories()),
            Some("Blue Bottle".into())
        );
        assert_eq!(
            extract_merchant("What about 'Uber' this month", &categories()),
            Some("Uber".into())
        );
    }

    #[test]
    fn test_extract_merchant_ignores_apostrophes() {
        assert_eq!(
            extract_merchant("I'm curious what I spent at Costco", &categories()),
            Some("Costco".into())
        );
    }

    #[test]
    fn test_extract_merchant_rejects_category() {
        assert_eq!(extract_merchant("spend on food in 2025-05", &categories()), None);
        assert_eq!(extract_merchant("total \"Travel\"", &categories()), None);
    }

    #[test]
    fn test_names_merchant() {
        assert!(names_merchant("spent at target in 2025-06", &categories()));
        assert!(names_merchant("\"blue bottle\" 2025-06", &categories()));
        // A phrase with nothing extractable still counts
        assert!(names_merchant("what did i spend on 2025-06", &categories()));
        assert_eq!(extract_merchant("what did I spend on 2025-06", &categories()), None);
        assert!(!names_merchant("total \"travel\"", &categories()));
        assert!(!names_merchant("what did i spend in 2025-06", &categories()));
    }

    #[test]
    fn test_extract_merchant_skips_empty_span() {
        assert_eq!(
            extract_merchant("spend on 2025-06 at Target", &categories()),
            Some("Target".into())
        );
        assert_eq!(extract_merchant("what did I spend in 2025-06", &categories()), None);
    }

    #[test]
    fn test_extract_source_exact_after_preposition() {
        let known = strings(&["Cash", "Credit Card"]);
        assert_eq!(
            extract_source("How much did I spend using cash in 2025-06", &known),
            Some("Cash".into())
        );
    }

    #[test]
    fn test_extract_source_contained_in_span() {
        let known = strings(&["Credit Card", "Card"]);
        assert_eq!(
            extract_source("spent via credit card payment this month", &known),
            Some("Credit Card".into())
        );
    }

    #[test]
    fn test_extract_source_whole_question_fallback() {
        let known = strings(&["Amex"]);
        assert_eq!(
            extract_source("Amex spend for 2025-06", &known),
            Some("Amex".into())
        );
        assert_eq!(extract_source("spent with my card", &known), None);
    }

    #[test]
    fn test_anchored_span_stops_at_boundaries() {
        assert_eq!(anchored_span(" credit card in 2025-06"), "credit card");
        assert_eq!(anchored_span(" the amex card 2025-06?"), "the amex card");
        assert_eq!(anchored_span(" cash, please"), "cash");
        assert_eq!(anchored_span(" the"), "");
    }

    #[test]
    fn test_preposition_phrase() {
        assert_eq!(
            preposition_phrase("spent using my debit card in 2025-06"),
            Some("my debit card".into())
        );
        assert_eq!(preposition_phrase("spent using the"), None);
        assert_eq!(preposition_phrase("from 2025-06"), None);
    }
}
