use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use tracing::debug;

use super::PriceSource;
use crate::domain::price::PriceSample;
use crate::shared::errors::FetchError;
use crate::shared::types::{PriceApiConfig, SymbolPair};

/// Response of /api/v3/ticker/price
#[derive(Debug, Deserialize)]
struct TickerPrice {
    symbol: String,
    price: String,
}

/// Binance public ticker client
pub struct BinanceClient {
    http_client: Client,
    base_url: String,
}

impl BinanceClient {
    pub fn new(config: &PriceApiConfig) -> Result<Self, FetchError> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| FetchError::Transient {
                symbol: String::new(),
                reason: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn ticker_url(&self) -> String {
        format!("{}/api/v3/ticker/price", self.base_url)
    }
}

/// Map a non-success HTTP status to a fetch error
pub fn classify_status(symbol: &str, status: StatusCode, body: &str) -> FetchError {
    // 429 and 418 are Binance rate-limit responses, not a verdict on the symbol
    if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::IM_A_TEAPOT {
        return FetchError::Transient {
            symbol: symbol.to_string(),
            reason: format!("rate limited ({})", status),
        };
    }
    if status.is_client_error() {
        return FetchError::UnknownSymbol(symbol.to_string());
    }
    FetchError::Transient {
        symbol: symbol.to_string(),
        reason: format!("status {}: {}", status, body.trim()),
    }
}

/// Decode a ticker body into a sample for `pair`
pub fn parse_ticker(pair: &SymbolPair, body: &str) -> Result<PriceSample, FetchError> {
    let symbol = pair.key();
    let invalid = |reason: String| FetchError::InvalidResponse {
        symbol: symbol.clone(),
        reason,
    };

    let ticker: TickerPrice = serde_json::from_str(body).map_err(|e| invalid(e.to_string()))?;
    if !ticker.symbol.eq_ignore_ascii_case(&symbol) {
        return Err(invalid(format!("response is for {}", ticker.symbol)));
    }
    let price = Decimal::from_str(ticker.price.trim())
        .map_err(|e| invalid(format!("bad price {:?}: {}", ticker.price, e)))?;
    if price.is_sign_negative() && !price.is_zero() {
        return Err(invalid(format!("negative price {}", price)));
    }
    Ok(PriceSample::new(pair.clone(), price))
}

#[async_trait]
impl PriceSource for BinanceClient {
    async fn fetch(&self, pair: &SymbolPair) -> Result<PriceSample, FetchError> {
        let symbol = pair.key();
        let url = self.ticker_url();
        debug!("Fetching {} from {}", symbol, url);

        let transient = |e: reqwest::Error| FetchError::Transient {
            symbol: symbol.clone(),
            reason: e.to_string(),
        };

        let response = self
            .http_client
            .get(&url)
            .query(&[("symbol", symbol.as_str())])
            .send()
            .await
            .map_err(transient)?;
        let status = response.status();
        let body = response.text().await.map_err(transient)?;

        if !status.is_success() {
            return Err(classify_status(&symbol, status, &body));
        }

        let sample = parse_ticker(pair, &body)?;
        debug!("{} = {}", symbol, sample.price);
        Ok(sample)
    }
}
