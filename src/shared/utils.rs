//! Utility functions and helpers

use chrono::NaiveDateTime;
use rust_decimal::{Decimal, RoundingStrategy};

/// Round a decimal to 2 places, halves away from zero
pub fn round_2dp(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Format a price with exactly 2 decimals, e.g. "50000.00"
pub fn format_price(price: Decimal) -> String {
    format!("{:.2}", round_2dp(price))
}

/// Cycle timestamp as shown in notifications, e.g. "10/18/26 14:05:00"
pub fn format_timestamp(at: NaiveDateTime) -> String {
    at.format("%m/%d/%y %H:%M:%S").to_string()
}
