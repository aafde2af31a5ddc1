//! Question answering command

use anyhow::{Context, Result};
use tally_core::{
    db::Database, money::format_currency, NumberValue, QueryEngine, QueryRequest, QueryResponse,
    TallyConfig,
};
use tracing::debug;

use super::truncate;

pub fn cmd_ask(
    db: &Database,
    config: &TallyConfig,
    question: &str,
    month: Option<&str>,
    limit: Option<i64>,
    json: bool,
) -> Result<()> {
    let mut request = QueryRequest::new(question);
    if let Some(month) = month {
        request = request.month(month);
    }
    if let Some(limit) = limit {
        request = request.limit_evidence(limit);
    }

    let response = QueryEngine::new(db, config)
        .answer(&request)
        .context("Failed to answer question")?;
    debug!(intent = %response.trace.intent, "Answered question");

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    print_response(&response)
}

fn print_response(response: &QueryResponse) -> Result<()> {
    println!();
    if let Some(answer) = &response.final_answer {
        println!("💬 {}", answer);
    }
    if let Some(question) = &response.clarifying_question {
        println!("❓ {}", question);
    }

    if let Some(numbers) = response.numbers.as_ref().filter(|n| !n.is_empty()) {
        println!();
        println!("🔢 Numbers");
        println!("   ─────────────────────────────────────────────────────────────");
        for (key, value) in numbers.iter() {
            let shown = match value {
                NumberValue::Amount(amount) => format_currency(*amount),
                NumberValue::Count(count) => count.to_string(),
            };
            println!("   {:30} {:>14}", truncate(key, 30), shown);
        }
    }

    if !response.evidence.is_empty() {
        println!();
        println!("🧾 Evidence ({} rows)", response.evidence.len());
        println!("   ─────────────────────────────────────────────────────────────");
        for row in &response.evidence {
            println!(
                "   {} │ {:>11} │ {:20} │ {:12} │ {}",
                row.date,
                format_currency(row.amount),
                truncate(row.merchant.as_deref().unwrap_or("-"), 20),
                truncate(row.category.as_deref().unwrap_or("-"), 12),
                row.source.as_deref().unwrap_or("-")
            );
        }
    }

    let trace = &response.trace;
    println!();
    println!("🔎 Trace");
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Intent: {}", trace.intent);
    match &trace.resolved_month {
        Some(month) => println!("   Month: {}", month),
        None => println!("   Month: (unresolved)"),
    }
    if !trace.called_functions.is_empty() {
        println!("   Called: {}", trace.called_functions.join(" → "));
    }
    if !trace.parameters.is_empty() {
        println!("   Parameters: {}", serde_json::to_string(&trace.parameters)?);
    }
    if let Some(filters) = &trace.filters_used {
        println!("   Filters: {}", serde_json::to_string(filters)?);
    }
    println!("   Evidence returned: {}", trace.evidence_count_returned);
    for note in &trace.notes {
        println!("   Note: {}", note);
    }

    Ok(())
}
