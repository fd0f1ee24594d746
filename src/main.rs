mod app;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use tickerbot::shared::config::ConfigLoader;

#[derive(Parser, Debug)]
#[command(version, about = "Posts crypto spot prices and their change to a Discord channel")]
struct Args {
    /// Path to settings file
    #[arg(long, default_value = "settings.toml")]
    config: PathBuf,

    /// File holding the bot token (DISCORD_TOKEN takes precedence)
    #[arg(long, default_value = "keys/discord_token.key")]
    token_file: PathBuf,

    /// Minutes between updates (overrides config)
    #[arg(long)]
    interval: Option<u64>,

    /// Symbols to track, comma-separated (e.g. BTC/USDT,ETH/USDT; overrides config)
    #[arg(long)]
    symbols: Option<String>,

    /// Log notifications instead of sending them to Discord
    #[arg(long)]
    dry_run: bool,

    /// Stop on the first failed fetch or send
    #[arg(long)]
    fail_fast: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    // Priority: CLI args > Config file > Defaults
    let bot_config = ConfigLoader::load(&args.config)
        .with_context(|| format!("load config {}", args.config.display()))?;
    let mut app_cfg = app::AppCfg::from_config(bot_config, args.token_file, args.dry_run);

    if let Some(interval) = args.interval {
        app_cfg = app_cfg.with_interval(interval)?;
    }
    if let Some(symbols) = args.symbols {
        app_cfg = app_cfg.with_symbols(&symbols)?;
    }
    if args.fail_fast {
        app_cfg = app_cfg.fail_fast();
    }

    app::run(app_cfg).await
}
