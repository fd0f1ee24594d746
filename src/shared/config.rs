use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::shared::errors::ConfigError;
use crate::shared::types::{
    validate_interval, ActivityKind, AuthorConfig, BotConfig, FailurePolicy, PriceApiConfig, Presence,
    SymbolPair,
};

pub const DEFAULT_COLOR: u32 = 0xFF8008;
pub const TOKEN_ENV_VAR: &str = "DISCORD_TOKEN";

/// Integer setting that may also be written as a numeric string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum IntOrString {
    Int(i64),
    Str(String),
}

impl IntOrString {
    fn coerce(&self, field: &'static str) -> Result<u64, ConfigError> {
        let type_error = |value: String| ConfigError::ConfigTypeError { field, value };
        match self {
            IntOrString::Int(i) => u64::try_from(*i).map_err(|_| type_error(i.to_string())),
            IntOrString::Str(s) => s.trim().parse::<u64>().map_err(|_| type_error(s.clone())),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawSymbol {
    base: String,
    quote: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawPriceApi {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    max_attempts: Option<u32>,
    retry_backoff_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawSettings {
    channel_id: IntOrString,
    interval: IntOrString,
    status_type: String,
    status: String,
    on_fetch_error: Option<FailurePolicy>,
    parallel_fetch: Option<bool>,
    color: Option<u32>,
    author: Option<AuthorConfig>,
    price_api: Option<RawPriceApi>,
    #[serde(default)]
    symbols: Vec<RawSymbol>,
}

/// Загрузчик конфигурации
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate a TOML settings file
    pub fn load(path: impl AsRef<Path>) -> Result<BotConfig, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<BotConfig, ConfigError> {
        let raw: RawSettings = toml::from_str(content)?;

        let channel_id = raw.channel_id.coerce("channel_id")?;
        let interval_minutes = validate_interval(raw.interval.coerce("interval")?)?;

        let presence = Presence {
            kind: ActivityKind::parse(&raw.status_type)?,
            text: raw.status,
        };

        let symbols = resolve_symbols(
            raw.symbols
                .iter()
                .map(|s| (s.base.as_str(), s.quote.as_str())),
        )?;

        let defaults = PriceApiConfig::default();
        let api = raw.price_api.unwrap_or_default();
        let price_api = PriceApiConfig {
            base_url: api
                .base_url
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            timeout: api.timeout_secs.map(Duration::from_secs).unwrap_or(defaults.timeout),
            max_attempts: api.max_attempts.unwrap_or(defaults.max_attempts).max(1),
            retry_backoff: api
                .retry_backoff_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_backoff),
        };

        Ok(BotConfig {
            channel_id,
            interval_minutes,
            presence,
            symbols,
            on_fetch_error: raw.on_fetch_error.unwrap_or_default(),
            parallel_fetch: raw.parallel_fetch.unwrap_or(false),
            color: raw.color.unwrap_or(DEFAULT_COLOR),
            author: raw.author,
            price_api,
        })
    }

    /// Bot token from DISCORD_TOKEN, falling back to the token file
    pub fn load_token(token_file: impl AsRef<Path>) -> Result<String, ConfigError> {
        Self::token_from(std::env::var(TOKEN_ENV_VAR).ok(), token_file.as_ref())
    }

    fn token_from(env_token: Option<String>, token_file: &Path) -> Result<String, ConfigError> {
        if let Some(token) = env_token.map(|t| t.trim().to_string()) {
            if !token.is_empty() {
                return Ok(token);
            }
        }
        match fs::read_to_string(token_file) {
            Ok(content) if !content.trim().is_empty() => Ok(content.trim().to_string()),
            Ok(_) => Err(ConfigError::MissingToken),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ConfigError::MissingToken),
            Err(source) => Err(ConfigError::Read {
                path: token_file.display().to_string(),
                source,
            }),
        }
    }
}

/// Build the symbol set, defaulting to BTC/USDT when nothing is configured
pub fn resolve_symbols<'a>(
    pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Result<Vec<SymbolPair>, ConfigError> {
    let symbols = pairs
        .into_iter()
        .map(|(base, quote)| SymbolPair::new(base, quote))
        .collect::<Result<Vec<_>, _>>()?;
    if symbols.is_empty() {
        return Ok(vec![SymbolPair::default_pair()]);
    }
    Ok(symbols)
}
