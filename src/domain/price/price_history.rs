//! Last observed price per symbol, kept for the lifetime of the process

use rust_decimal::Decimal;
use std::collections::HashMap;

use super::PriceSample;
use crate::shared::types::SymbolPair;

/// Result of recording a price
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// Nothing to compare against; the price only seeds history
    Baseline,
    /// Price stored for this symbol by the preceding observation
    Previous(Decimal),
}

/// Remembers the most recent price of every symbol.
///
/// The only way to change it is `observe`/`observe_cycle`, which always read the stored
/// price before replacing it.
#[derive(Debug)]
pub struct PriceHistory {
    prices: HashMap<String, Decimal>,
    first_cycle: bool,
}

impl Default for PriceHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceHistory {
    pub fn new() -> Self {
        Self {
            prices: HashMap::new(),
            first_cycle: true,
        }
    }

    /// True until the first cycle that recorded at least one price
    pub fn is_first_cycle(&self) -> bool {
        self.first_cycle
    }

    /// Record one price and return what it replaced
    pub fn observe(&mut self, pair: &SymbolPair, price: Decimal) -> Observation {
        let observation = match self.prices.insert(pair.key(), price) {
            Some(previous) => Observation::Previous(previous),
            None => Observation::Baseline,
        };
        self.first_cycle = false;
        observation
    }

    /// Record a whole cycle, in order.
    ///
    /// During the first cycle every sample is a baseline, including repeated symbols.
    pub fn observe_cycle(&mut self, samples: &[PriceSample]) -> Vec<Observation> {
        if self.first_cycle {
            for sample in samples {
                self.prices.insert(sample.pair.key(), sample.price);
            }
            if !samples.is_empty() {
                self.first_cycle = false;
            }
            return vec![Observation::Baseline; samples.len()];
        }

        samples
            .iter()
            .map(|sample| self.observe(&sample.pair, sample.price))
            .collect()
    }

    pub fn last_price(&self, pair: &SymbolPair) -> Option<Decimal> {
        self.prices.get(&pair.key()).copied()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}
