// src/app.rs
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use tickerbot::application::{Scheduler, SchedulerConfig, SystemClock};
use tickerbot::domain::notification::NotificationBuilder;
use tickerbot::infrastructure::{BinanceClient, ChatSession, ConsoleSession, DiscordSession};
use tickerbot::shared::config::ConfigLoader;
use tickerbot::shared::errors::ConfigError;
use tickerbot::shared::types::{validate_interval, BotConfig, FailurePolicy, SymbolPair};

#[derive(Debug, Clone)]
pub struct AppCfg {
    pub bot: BotConfig,
    pub token_file: PathBuf,
    pub dry_run: bool,
}

impl AppCfg {
    pub fn from_config(bot: BotConfig, token_file: PathBuf, dry_run: bool) -> Self {
        Self {
            bot,
            token_file,
            dry_run,
        }
    }

    pub fn with_interval(mut self, minutes: u64) -> Result<Self, ConfigError> {
        self.bot.interval_minutes = validate_interval(minutes)?;
        Ok(self)
    }

    /// Replace the symbol set with a comma-separated list like "BTC/USDT,ETH/USDT"
    pub fn with_symbols(mut self, symbols: &str) -> Result<Self, ConfigError> {
        let parsed = symbols
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(SymbolPair::parse)
            .collect::<Result<Vec<_>, _>>()?;
        self.bot.symbols = if parsed.is_empty() {
            vec![SymbolPair::default_pair()]
        } else {
            parsed
        };
        Ok(self)
    }

    pub fn fail_fast(mut self) -> Self {
        self.bot.on_fetch_error = FailurePolicy::Abort;
        self
    }
}

pub async fn run(app_cfg: AppCfg) -> Result<()> {
    info!("Starting tickerbot");
    info!("Configuration: {:?}", app_cfg.bot);

    let price_client = BinanceClient::new(&app_cfg.bot.price_api).context("create price client")?;

    let session: Arc<dyn ChatSession> = if app_cfg.dry_run {
        warn!("Dry run: notifications are logged, nothing is sent to Discord");
        Arc::new(ConsoleSession)
    } else {
        let token = ConfigLoader::load_token(&app_cfg.token_file)
            .with_context(|| format!("load token from {}", app_cfg.token_file.display()))?;
        let session = DiscordSession::connect(&token)
            .await
            .context("connect to Discord")?;
        Arc::new(session)
    };

    let mut scheduler = Scheduler::new(
        SchedulerConfig::from(&app_cfg.bot),
        NotificationBuilder::from_config(&app_cfg.bot),
        Arc::new(price_client),
        session,
        Arc::new(SystemClock),
    );

    let (stop, shutdown) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received, stopping after the current cycle…");
            let _ = stop.send(true);
        }
    });

    scheduler.run(shutdown).await?;
    Ok(())
}
