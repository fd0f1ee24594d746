//! Common types used across the application

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::shared::errors::ConfigError;

/// Largest update interval whose length in seconds still fits a `u64`
pub const MAX_INTERVAL_MINUTES: u64 = u64::MAX / 60;

/// Trading pair, e.g. BTC/USDT. Asset codes are stored uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolPair {
    pub base: String,
    pub quote: String,
}

impl SymbolPair {
    pub fn new(base: &str, quote: &str) -> Result<Self, ConfigError> {
        let base = base.trim();
        let quote = quote.trim();
        let is_asset_code = |code: &str| !code.is_empty() && code.chars().all(|c| c.is_ascii_alphanumeric());
        if !is_asset_code(base) || !is_asset_code(quote) {
            return Err(ConfigError::InvalidSymbol(format!("{}/{}", base, quote)));
        }
        Ok(Self {
            base: base.to_uppercase(),
            quote: quote.to_uppercase(),
        })
    }

    /// Identity key and API query symbol, e.g. "BTCUSDT"
    pub fn key(&self) -> String {
        format!("{}{}", self.base, self.quote)
    }

    /// Parse "BTC/USDT" (also accepts '-' or ':' as separator)
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let (base, quote) = s
            .split_once(|c| c == '/' || c == '-' || c == ':')
            .ok_or_else(|| ConfigError::InvalidSymbol(s.to_string()))?;
        Self::new(base, quote)
    }

    pub fn default_pair() -> Self {
        Self {
            base: "BTC".to_string(),
            quote: "USDT".to_string(),
        }
    }
}

impl fmt::Display for SymbolPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.base, self.quote)
    }
}

/// Presence activity shown next to the bot name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    Playing,
    Streaming,
    Listening,
    Watching,
}

impl ActivityKind {
    /// Case-insensitive substring match, so "Watching" and "is watching" both work.
    pub fn parse(status_type: &str) -> Result<Self, ConfigError> {
        let lowered = status_type.to_lowercase();
        if lowered.contains("playing") {
            Ok(ActivityKind::Playing)
        } else if lowered.contains("streaming") {
            Ok(ActivityKind::Streaming)
        } else if lowered.contains("listening") {
            Ok(ActivityKind::Listening)
        } else if lowered.contains("watching") {
            Ok(ActivityKind::Watching)
        } else {
            Err(ConfigError::UnknownStatusType(status_type.to_string()))
        }
    }

    /// Discord gateway activity type id
    pub fn code(&self) -> u8 {
        match self {
            ActivityKind::Playing => 0,
            ActivityKind::Streaming => 1,
            ActivityKind::Listening => 2,
            ActivityKind::Watching => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presence {
    pub kind: ActivityKind,
    pub text: String,
}

/// What the scheduler does when a symbol cannot be fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Log and leave the symbol out of this cycle's notification
    #[default]
    Skip,
    /// Stop the bot on the first failure
    Abort,
}

/// Price API client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceApiConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub max_attempts: u32,
    pub retry_backoff: Duration,
}

impl Default for PriceApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.binance.com".to_string(),
            timeout: Duration::from_secs(10),
            max_attempts: 3,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

/// Notification author line
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthorConfig {
    pub name: String,
    pub icon_url: Option<String>,
}

/// Validated bot configuration
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub channel_id: u64,
    pub interval_minutes: u64,
    pub presence: Presence,
    pub symbols: Vec<SymbolPair>,
    pub on_fetch_error: FailurePolicy,
    pub parallel_fetch: bool,
    pub color: u32,
    pub author: Option<AuthorConfig>,
    pub price_api: PriceApiConfig,
}

impl BotConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.saturating_mul(60))
    }
}

/// Checks an interval given in minutes
pub fn validate_interval(minutes: u64) -> Result<u64, ConfigError> {
    if minutes == 0 || minutes > MAX_INTERVAL_MINUTES {
        return Err(ConfigError::InvalidInterval);
    }
    Ok(minutes)
}
