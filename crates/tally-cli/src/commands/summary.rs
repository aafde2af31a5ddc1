//! Monthly report command

use anyhow::Result;
use tally_core::{db::Database, models::GroupSpending, money::format_currency, TallyConfig};

use super::truncate;

pub fn cmd_summary(
    db: &Database,
    config: &TallyConfig,
    month: &str,
    top_k: Option<usize>,
) -> Result<()> {
    let top_k = top_k.unwrap_or(config.default_top_k);
    if top_k == 0 || top_k > config.max_top_k {
        anyhow::bail!("--top-k must be between 1 and {}", config.max_top_k);
    }

    let summary = db.monthly_summary(month, top_k)?;
    let totals = &summary.totals;

    println!();
    println!("📊 Monthly Summary: {}", summary.month);
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Spent:        {:>14}", format_currency(totals.expense_total));
    println!("   Income:       {:>14}", format_currency(totals.income_total));
    println!("   Net:          {:>14}", format_currency(totals.net_total));
    println!("   Transactions: {:>14}", totals.transaction_count);

    print_groups("📂 By Category", "Category", &summary.by_category);
    print_groups("🏪 Top Merchants", "Merchant", &summary.top_merchants);
    print_groups("💳 By Source", "Source", &summary.by_source);

    Ok(())
}

fn print_groups(title: &str, label: &str, groups: &[GroupSpending]) {
    println!();
    println!("{}", title);

    if groups.is_empty() {
        println!("   No spending found.");
        return;
    }

    println!("   {:3} │ {:30} │ {:>12} │ {:>5}", "#", label, "Amount", "Count");
    println!("   ────┼────────────────────────────────┼──────────────┼───────");

    for (i, group) in groups.iter().enumerate() {
        println!(
            "   {:>3} │ {:30} │ {:>12} │ {:>5}",
            i + 1,
            truncate(&group.name, 30),
            format_currency(group.expense_total),
            group.count
        );
    }
}
