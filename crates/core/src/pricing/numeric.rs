//! Lenient number parsing for markup attributes and form inputs.
//!
//! Parsing reads the longest numeric prefix and never fails loudly; callers
//! decide the fallback value.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use tracing::warn;

/// Parses a decimal prefix such as `12.50`, `12,50 €` or `-3`.
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let prefix = numeric_prefix(raw.trim(), true)?;
    Decimal::from_str(&prefix.replace(',', ".")).ok()
}

/// Parses an integer prefix such as `25`, `25 Stück` or `-1`.
pub fn parse_integer(raw: &str) -> Option<i64> {
    numeric_prefix(raw.trim(), false)?.parse::<i64>().ok()
}

/// Non-negative price; anything unparseable or negative prices as zero.
pub fn price_or_zero(raw: Option<&str>) -> Decimal {
    raw.and_then(parse_decimal).filter(|value| *value >= Decimal::ZERO).unwrap_or(Decimal::ZERO)
}

/// Positive count, or `fallback` for missing, unparseable, zero or negative input.
pub fn positive_or(raw: Option<&str>, fallback: u32) -> u32 {
    raw.and_then(parse_integer)
        .filter(|value| *value > 0)
        .map(|value| u32::try_from(value).unwrap_or(u32::MAX))
        .unwrap_or(fallback)
}

/// Product of non-negative factors, clamped to `Decimal::MAX` on overflow.
pub fn saturating_product(factors: &[Decimal]) -> Decimal {
    if factors.iter().any(Decimal::is_zero) {
        return Decimal::ZERO;
    }
    factors
        .iter()
        .copied()
        .try_fold(Decimal::ONE, Decimal::checked_mul)
        .unwrap_or_else(saturated)
}

/// Sum of non-negative amounts, clamped to `Decimal::MAX` on overflow.
pub fn saturating_sum(amounts: impl IntoIterator<Item = Decimal>) -> Decimal {
    amounts.into_iter().try_fold(Decimal::ZERO, Decimal::checked_add).unwrap_or_else(saturated)
}

fn saturated() -> Decimal {
    warn!(event_name = "pricing.amount.saturated", "amount exceeds decimal range; clamped");
    Decimal::MAX
}

/// Rounds half away from zero to two fraction digits for display.
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{rounded:.2}")
}

fn numeric_prefix(input: &str, allow_fraction: bool) -> Option<String> {
    let mut prefix = String::new();
    let mut chars = input.chars().peekable();

    if let Some(sign) = chars.next_if(|ch| *ch == '-' || *ch == '+') {
        prefix.push(sign);
    }

    let mut integer_digits = 0;
    while let Some(digit) = chars.next_if(char::is_ascii_digit) {
        prefix.push(digit);
        integer_digits += 1;
    }

    if allow_fraction {
        if let Some(separator) = chars.next_if(|ch| *ch == '.' || *ch == ',') {
            let mut fraction = String::new();
            while let Some(digit) = chars.next_if(char::is_ascii_digit) {
                fraction.push(digit);
            }
            if !fraction.is_empty() {
                if integer_digits == 0 {
                    prefix.push('0');
                }
                prefix.push(separator);
                prefix.push_str(&fraction);
                integer_digits += 1;
            }
        }
    }

    (integer_digits > 0).then_some(prefix)
}
