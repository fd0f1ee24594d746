//! Price domain - samples, history and change calculation

mod delta;
mod price_history;

pub use delta::{format_delta, percentage_change, DeltaDisplay};
pub use price_history::{Observation, PriceHistory};

use crate::shared::types::SymbolPair;
use rust_decimal::Decimal;

/// Price observed for one symbol during one cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceSample {
    pub pair: SymbolPair,
    /// Rounded to 2 decimal places, the precision shown and remembered
    pub price: Decimal,
}

impl PriceSample {
    pub fn new(pair: SymbolPair, price: Decimal) -> Self {
        Self {
            pair,
            price: crate::shared::utils::round_2dp(price),
        }
    }
}

/// A sample paired with how it compares to the previous cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub sample: PriceSample,
    pub delta: DeltaDisplay,
}
