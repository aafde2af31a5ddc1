//! Money parsing and formatting
//!
//! Amounts are exact decimals with two fractional digits. The ledger stores
//! them as integer cents; everything above the store sees `Decimal`.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{Error, Result};

/// Round to cents using banker's rounding
pub fn quantize(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
    rounded.rescale(2);
    rounded
}

/// Parse an amount cell such as `$1,234.56` or `-$10.00`.
///
/// Currency symbols and thousands separators are dropped, the sign is kept,
/// and the value is quantized to cents.
pub fn parse_amount(s: &str) -> Result<Decimal> {
    let cleaned: String = s.trim().chars().filter(|c| *c != '$' && *c != ',').collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return Err(Error::Import(format!("Unable to parse amount: '{}'", s)));
    }
    let value: Decimal = cleaned
        .parse()
        .map_err(|_| Error::Import(format!("Unable to parse amount: '{}'", s)))?;
    Ok(quantize(value))
}

/// Convert a decimal amount to integer cents
pub fn to_cents(amount: Decimal) -> Result<i64> {
    let cents = quantize(amount).mantissa();
    i64::try_from(cents).map_err(|_| Error::InvalidData(format!("Amount out of range: {}", amount)))
}

/// Convert integer cents back into a two-digit decimal
pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// Format for display: `$1,234.56`, negatives as `-$10.00`
pub fn format_currency(amount: Decimal) -> String {
    let amount = quantize(amount);
    let sign = if amount.is_sign_negative() && !amount.is_zero() {
        "-"
    } else {
        ""
    };
    let text = amount.abs().to_string();
    let (whole, frac) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}${}.{}", sign, grouped, frac)
}
