//! Error handling for the application

use thiserror::Error;

/// Startup configuration errors. Any of these stops the bot before the first cycle.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {field}: {value:?} is not an integer")]
    ConfigTypeError { field: &'static str, value: String },

    #[error("Unknown status type {0:?}, must be one of: playing/streaming/listening/watching")]
    UnknownStatusType(String),

    #[error("Interval must be between 1 and {} minutes", crate::shared::types::MAX_INTERVAL_MINUTES)]
    InvalidInterval,

    #[error("Invalid symbol pair: {0:?}")]
    InvalidSymbol(String),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Discord token not found (set DISCORD_TOKEN or provide a token file)")]
    MissingToken,
}

/// Price fetch errors, scoped to a single symbol
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("Price API unreachable for {symbol}: {reason}")]
    Transient { symbol: String, reason: String },

    #[error("Invalid price response for {symbol}: {reason}")]
    InvalidResponse { symbol: String, reason: String },
}

impl FetchError {
    /// Only network-level failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Transient { .. })
    }
}

/// Delta calculation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeltaError {
    #[error("Previous price is zero, percentage change is undefined")]
    DivisionByZero,

    #[error("Percentage change is out of range")]
    Overflow,
}

/// Chat session and delivery errors
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Discord rejected the request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// General application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}
