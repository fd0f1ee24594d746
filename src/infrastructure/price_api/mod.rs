//! Spot price sources

pub mod binance_client;

pub use binance_client::BinanceClient;

use async_trait::async_trait;
use crate::domain::price::PriceSample;
use crate::shared::errors::FetchError;
use crate::shared::types::SymbolPair;

/// Fetches the current price of one trading pair. Implementations do not retry.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch(&self, pair: &SymbolPair) -> Result<PriceSample, FetchError>;
}
