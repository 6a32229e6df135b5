//! Decimal money helpers.
//!
//! Prices are `rust_decimal::Decimal` values in US dollars. They travel as
//! JSON numbers, so struct fields use `#[serde(with = "rust_decimal::serde::float")]`.

use rust_decimal::{Decimal, RoundingStrategy};

/// ISO 4217 code for every price in the catalog.
pub const CURRENCY: &str = "USD";

/// Round a dollar amount to whole cents (half away from zero).
#[must_use]
pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Format a percentage with one decimal place and a `%` suffix (`58.7%`).
#[must_use]
pub fn format_percent(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);
    format!("{rounded:.1}%")
}
