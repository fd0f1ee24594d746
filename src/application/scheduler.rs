//! Price tracking cycle: fetch → observe → build → dispatch → sleep

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::domain::notification::{Notification, NotificationBuilder};
use crate::domain::price::{DeltaDisplay, PriceHistory, PriceSample, Quote};
use crate::infrastructure::discord::ChatSession;
use crate::infrastructure::price_api::PriceSource;
use crate::shared::errors::{AppError, FetchError};
use crate::shared::types::{BotConfig, FailurePolicy, Presence, SymbolPair};

/// Time source for the scheduler, replaceable in tests
#[async_trait]
pub trait Clock: Send + Sync {
    /// Wall-clock time used for the notification timestamp
    fn now(&self) -> NaiveDateTime;

    async fn sleep(&self, duration: Duration);
}

/// Local time and tokio timers
#[derive(Debug, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Presence not set yet
    Idle,
    Running,
    Stopped,
}

/// Scheduler settings
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub channel_id: u64,
    pub interval: Duration,
    pub presence: Presence,
    pub symbols: Vec<SymbolPair>,
    pub on_fetch_error: FailurePolicy,
    pub parallel_fetch: bool,
    /// Total attempts per symbol, including the first one
    pub max_attempts: u32,
    pub retry_backoff: Duration,
}

impl From<&BotConfig> for SchedulerConfig {
    fn from(config: &BotConfig) -> Self {
        Self {
            channel_id: config.channel_id,
            interval: config.interval(),
            presence: config.presence.clone(),
            symbols: config.symbols.clone(),
            on_fetch_error: config.on_fetch_error,
            parallel_fetch: config.parallel_fetch,
            max_attempts: config.price_api.max_attempts.max(1),
            retry_backoff: config.price_api.retry_backoff,
        }
    }
}

/// Outcome of one cycle
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub notification: Notification,
    /// Symbols left out of the notification
    pub skipped: Vec<(SymbolPair, FetchError)>,
    pub delivered: bool,
}

/// Drives the repeating cycle and owns the price history
pub struct Scheduler {
    config: SchedulerConfig,
    builder: NotificationBuilder,
    price_source: Arc<dyn PriceSource>,
    session: Arc<dyn ChatSession>,
    clock: Arc<dyn Clock>,
    history: PriceHistory,
    state: SchedulerState,
    cycles: u64,
}

impl Scheduler {
    pub fn new(
        config: SchedulerConfig,
        builder: NotificationBuilder,
        price_source: Arc<dyn PriceSource>,
        session: Arc<dyn ChatSession>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            builder,
            price_source,
            session,
            clock,
            history: PriceHistory::new(),
            state: SchedulerState::Idle,
            cycles: 0,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn history(&self) -> &PriceHistory {
        &self.history
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Set the presence text and move to `Running`
    pub async fn start(&mut self) -> Result<(), AppError> {
        if self.state != SchedulerState::Idle {
            return Ok(());
        }
        self.session.set_presence(&self.config.presence).await?;
        self.state = SchedulerState::Running;
        info!(
            "🚀 Tracking {} symbol(s) every {:?}",
            self.config.symbols.len(),
            self.config.interval
        );
        Ok(())
    }

    /// Run cycles until `shutdown` turns true.
    ///
    /// Returns an error only under `FailurePolicy::Abort` or if the presence cannot be set.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), AppError> {
        self.start().await?;
        let clock = Arc::clone(&self.clock);

        loop {
            if *shutdown.borrow() {
                break;
            }

            if let Err(e) = self.run_cycle().await {
                error!("❌ Cycle failed, stopping: {}", e);
                self.state = SchedulerState::Stopped;
                return Err(e);
            }

            debug!("Sleeping {:?} until next cycle", self.config.interval);
            tokio::select! {
                _ = clock.sleep(self.config.interval) => {}
                _ = shutdown_requested(&mut shutdown) => break,
            }
        }

        info!("🛑 Scheduler stopped after {} cycle(s)", self.cycles);
        self.state = SchedulerState::Stopped;
        Ok(())
    }

    /// One full cycle: fetch every symbol, update history, build and send the notification
    pub async fn run_cycle(&mut self) -> Result<CycleReport, AppError> {
        let started_at = self.clock.now();
        self.cycles += 1;
        info!("🔄 Cycle {}: fetching {} symbol(s)", self.cycles, self.config.symbols.len());

        let mut samples = Vec::with_capacity(self.config.symbols.len());
        let mut skipped = Vec::new();
        for (pair, result) in self.fetch_all().await {
            match result {
                Ok(sample) => samples.push(sample),
                Err(e) if self.config.on_fetch_error == FailurePolicy::Abort => return Err(e.into()),
                Err(e) => {
                    warn!("⚠️ Skipping {} this cycle: {}", pair, e);
                    skipped.push((pair, e));
                }
            }
        }

        let observations = self.history.observe_cycle(&samples);
        let quotes: Vec<Quote> = samples
            .into_iter()
            .zip(observations.iter())
            .map(|(sample, observation)| {
                let delta = DeltaDisplay::from_observation(observation, sample.price);
                if delta == DeltaDisplay::Undefined {
                    warn!("⚠️ Previous price of {} was zero, change not shown", sample.pair);
                }
                Quote { sample, delta }
            })
            .collect();

        let notification = self.builder.build(started_at, &quotes);

        if quotes.is_empty() {
            warn!("⚠️ No prices fetched this cycle, nothing sent");
            return Ok(CycleReport {
                notification,
                skipped,
                delivered: false,
            });
        }

        let delivered = match self.session.send(self.config.channel_id, &notification).await {
            Ok(()) => {
                info!("📨 Sent {} price(s) to channel {}", quotes.len(), self.config.channel_id);
                true
            }
            Err(e) if self.config.on_fetch_error == FailurePolicy::Abort => return Err(e.into()),
            Err(e) => {
                error!("❌ Failed to send notification: {}", e);
                false
            }
        };

        Ok(CycleReport {
            notification,
            skipped,
            delivered,
        })
    }

    /// Results in symbol-set order. Under `Abort`, sequential fetching stops at the first failure.
    async fn fetch_all(&self) -> Vec<(SymbolPair, Result<PriceSample, FetchError>)> {
        if self.config.parallel_fetch {
            return join_all(self.config.symbols.iter().map(|pair| async move {
                (pair.clone(), self.fetch_with_retry(pair).await)
            }))
            .await;
        }

        let mut results = Vec::with_capacity(self.config.symbols.len());
        for pair in &self.config.symbols {
            let result = self.fetch_with_retry(pair).await;
            let failed = result.is_err();
            results.push((pair.clone(), result));
            if failed && self.config.on_fetch_error == FailurePolicy::Abort {
                break;
            }
        }
        results
    }

    async fn fetch_with_retry(&self, pair: &SymbolPair) -> Result<PriceSample, FetchError> {
        let mut attempt = 1;
        loop {
            match self.price_source.fetch(pair).await {
                Ok(sample) => return Ok(sample),
                Err(e) if e.is_retryable() && attempt < self.config.max_attempts => {
                    let backoff = self.config.retry_backoff * 2u32.saturating_pow(attempt - 1);
                    warn!(
                        "⚠️ Attempt {}/{} for {} failed: {}, retrying in {:?}",
                        attempt, self.config.max_attempts, pair, e, backoff
                    );
                    self.clock.sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Resolves once shutdown is requested; never resolves if the sender is gone
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::errors::DispatchError;
    use crate::shared::types::ActivityKind;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    /// Scripted prices per symbol key, consumed in order
    #[derive(Default)]
    struct FakePrices {
        scripts: Mutex<HashMap<String, VecDeque<Result<Decimal, FetchError>>>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakePrices {
        fn script(self, key: &str, results: Vec<Result<Decimal, FetchError>>) -> Self {
            self.scripts
                .lock()
                .unwrap()
                .insert(key.to_string(), results.into_iter().collect());
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PriceSource for FakePrices {
        async fn fetch(&self, pair: &SymbolPair) -> Result<PriceSample, FetchError> {
            let key = pair.key();
            self.calls.lock().unwrap().push(key.clone());
            let next = self
                .scripts
                .lock()
                .unwrap()
                .get_mut(&key)
                .and_then(|script| script.pop_front());
            match next {
                Some(Ok(price)) => Ok(PriceSample::new(pair.clone(), price)),
                Some(Err(e)) => Err(e),
                None => Err(FetchError::UnknownSymbol(key)),
            }
        }
    }

    #[derive(Default)]
    struct RecordingSession {
        presence: Mutex<Option<Presence>>,
        sent: Mutex<Vec<(u64, Notification)>>,
        fail_sends: bool,
        stop_after: Option<(usize, watch::Sender<bool>)>,
    }

    impl RecordingSession {
        fn sent_text(&self) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|(_, n)| n.render_text())
                .collect()
        }
    }

    #[async_trait]
    impl ChatSession for RecordingSession {
        async fn set_presence(&self, presence: &Presence) -> Result<(), DispatchError> {
            *self.presence.lock().unwrap() = Some(presence.clone());
            Ok(())
        }

        async fn send(&self, channel_id: u64, notification: &Notification) -> Result<(), DispatchError> {
            if self.fail_sends {
                return Err(DispatchError::Rejected {
                    status: 403,
                    body: "Missing Access".to_string(),
                });
            }
            let count = {
                let mut sent = self.sent.lock().unwrap();
                sent.push((channel_id, notification.clone()));
                sent.len()
            };
            if let Some((limit, stop)) = &self.stop_after {
                if count >= *limit {
                    let _ = stop.send(true);
                }
            }
            Ok(())
        }
    }

    /// Fixed start time; sleeps return immediately and are recorded
    #[derive(Default)]
    struct ManualClock {
        sleeps: Mutex<Vec<Duration>>,
    }

    impl ManualClock {
        fn sleeps(&self) -> Vec<Duration> {
            self.sleeps.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Clock for ManualClock {
        fn now(&self) -> NaiveDateTime {
            NaiveDate::from_ymd_opt(2026, 10, 18)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap()
        }

        async fn sleep(&self, duration: Duration) {
            self.sleeps.lock().unwrap().push(duration);
            tokio::task::yield_now().await;
        }
    }

    fn pair(base: &str, quote: &str) -> SymbolPair {
        SymbolPair::new(base, quote).unwrap()
    }

    fn config(symbols: Vec<SymbolPair>, policy: FailurePolicy) -> SchedulerConfig {
        SchedulerConfig {
            channel_id: 42,
            interval: Duration::from_secs(5 * 60),
            presence: Presence {
                kind: ActivityKind::Watching,
                text: "prices".to_string(),
            },
            symbols,
            on_fetch_error: policy,
            parallel_fetch: false,
            max_attempts: 3,
            retry_backoff: Duration::from_millis(500),
        }
    }

    fn transient(key: &str) -> FetchError {
        FetchError::Transient {
            symbol: key.to_string(),
            reason: "connection reset".to_string(),
        }
    }

    fn build_scheduler(
        config: SchedulerConfig,
        prices: Arc<FakePrices>,
        session: Arc<RecordingSession>,
        clock: Arc<ManualClock>,
    ) -> Scheduler {
        let builder = NotificationBuilder::new(config.interval.as_secs() / 60, 0xFF8008);
        Scheduler::new(config, builder, prices, session, clock)
    }

    #[tokio::test]
    async fn test_baseline_then_change() {
        let prices = Arc::new(
            FakePrices::default().script("BTCUSDT", vec![Ok(dec!(50000.00)), Ok(dec!(51000.00))]),
        );
        let session = Arc::new(RecordingSession::default());
        let clock = Arc::new(ManualClock::default());
        let mut scheduler = build_scheduler(
            config(vec![SymbolPair::default_pair()], FailurePolicy::Skip),
            prices,
            session.clone(),
            clock,
        );

        assert!(scheduler.history().is_first_cycle());
        scheduler.run_cycle().await.unwrap();
        assert!(!scheduler.history().is_first_cycle());
        assert_eq!(scheduler.history().len(), 1);
        scheduler.run_cycle().await.unwrap();

        assert_eq!(
            session.sent_text(),
            vec![
                "Prices ~ [m5]\n10/18/26 12:00:00\nBTCUSDT: $50000.00 ~ [baseline]".to_string(),
                "Prices ~ [m5]\n10/18/26 12:00:00\nBTCUSDT: $51000.00 ~ [+2.00%]".to_string(),
            ]
        );
        assert_eq!(
            scheduler.history().last_price(&SymbolPair::default_pair()),
            Some(dec!(51000))
        );
        assert_eq!(session.sent.lock().unwrap()[0].0, 42);
    }

    #[tokio::test]
    async fn test_start_sets_presence_once() {
        let session = Arc::new(RecordingSession::default());
        let mut scheduler = build_scheduler(
            config(vec![SymbolPair::default_pair()], FailurePolicy::Skip),
            Arc::new(FakePrices::default()),
            session.clone(),
            Arc::new(ManualClock::default()),
        );

        assert_eq!(scheduler.state(), SchedulerState::Idle);
        scheduler.start().await.unwrap();
        assert_eq!(scheduler.state(), SchedulerState::Running);
        let presence = session.presence.lock().unwrap().clone().unwrap();
        assert_eq!(presence.kind, ActivityKind::Watching);
        assert_eq!(presence.text, "prices");
    }

    #[tokio::test]
    async fn test_unknown_symbol_is_skipped_under_skip_policy() {
        let prices = Arc::new(
            FakePrices::default()
                .script("BTCUSDT", vec![Ok(dec!(50000)), Ok(dec!(50500))])
                .script("SOLUSDT", vec![Ok(dec!(150)), Ok(dec!(147))]),
        );
        let session = Arc::new(RecordingSession::default());
        let symbols = vec![pair("BTC", "USDT"), pair("FOO", "BAR"), pair("SOL", "USDT")];
        let mut scheduler = build_scheduler(
            config(symbols, FailurePolicy::Skip),
            prices.clone(),
            session.clone(),
            Arc::new(ManualClock::default()),
        );

        let first = scheduler.run_cycle().await.unwrap();
        assert!(first.delivered);
        assert_eq!(first.skipped.len(), 1);
        assert_eq!(first.skipped[0].0.key(), "FOOBAR");
        assert_eq!(first.skipped[0].1, FetchError::UnknownSymbol("FOOBAR".to_string()));

        let second = scheduler.run_cycle().await.unwrap();
        let values: Vec<String> = second
            .notification
            .fields
            .iter()
            .map(|f| format!("{}: {}", f.name, f.value()))
            .collect();
        assert_eq!(
            values,
            vec!["BTCUSDT: $50500.00 ~ [+1.00%]", "SOLUSDT: $147.00 ~ [-2.00%]"]
        );
        assert_eq!(scheduler.history().len(), 2);
        // unknown symbols are not retried
        assert_eq!(prices.calls().iter().filter(|c| *c == "FOOBAR").count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_symbol_aborts_under_abort_policy() {
        let prices = Arc::new(
            FakePrices::default()
                .script("BTCUSDT", vec![Ok(dec!(50000))])
                .script("SOLUSDT", vec![Ok(dec!(150))]),
        );
        let session = Arc::new(RecordingSession::default());
        let symbols = vec![pair("BTC", "USDT"), pair("FOO", "BAR"), pair("SOL", "USDT")];
        let mut scheduler = build_scheduler(
            config(symbols, FailurePolicy::Abort),
            prices.clone(),
            session.clone(),
            Arc::new(ManualClock::default()),
        );

        let err = scheduler.run_cycle().await.unwrap_err();
        assert!(matches!(err, AppError::Fetch(FetchError::UnknownSymbol(ref s)) if s == "FOOBAR"));
        assert_eq!(prices.calls(), vec!["BTCUSDT", "FOOBAR"]);
        assert!(session.sent_text().is_empty());
        assert!(scheduler.history().is_first_cycle());
    }

    #[tokio::test]
    async fn test_run_stops_on_abort() {
        let session = Arc::new(RecordingSession::default());
        let mut scheduler = build_scheduler(
            config(vec![pair("FOO", "BAR")], FailurePolicy::Abort),
            Arc::new(FakePrices::default()),
            session.clone(),
            Arc::new(ManualClock::default()),
        );
        let (_stop, shutdown) = watch::channel(false);

        assert!(scheduler.run(shutdown).await.is_err());
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
        assert_eq!(scheduler.cycles(), 1);
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried_with_backoff() {
        let prices = Arc::new(FakePrices::default().script(
            "BTCUSDT",
            vec![Err(transient("BTCUSDT")), Err(transient("BTCUSDT")), Ok(dec!(50000))],
        ));
        let clock = Arc::new(ManualClock::default());
        let mut scheduler = build_scheduler(
            config(vec![SymbolPair::default_pair()], FailurePolicy::Abort),
            prices.clone(),
            Arc::new(RecordingSession::default()),
            clock.clone(),
        );

        let report = scheduler.run_cycle().await.unwrap();
        assert!(report.skipped.is_empty());
        assert_eq!(prices.calls().len(), 3);
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_millis(500), Duration::from_millis(1000)]
        );
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let prices = Arc::new(FakePrices::default().script(
            "BTCUSDT",
            vec![
                Err(transient("BTCUSDT")),
                Err(transient("BTCUSDT")),
                Err(transient("BTCUSDT")),
                Ok(dec!(50000)),
            ],
        ));
        let session = Arc::new(RecordingSession::default());
        let mut scheduler = build_scheduler(
            config(vec![SymbolPair::default_pair()], FailurePolicy::Skip),
            prices.clone(),
            session.clone(),
            Arc::new(ManualClock::default()),
        );

        let report = scheduler.run_cycle().await.unwrap();
        assert_eq!(prices.calls().len(), 3);
        assert_eq!(report.skipped.len(), 1);
        assert!(!report.delivered);
        assert!(session.sent_text().is_empty());
        assert!(scheduler.history().is_first_cycle());
    }

    #[tokio::test]
    async fn test_zero_previous_price_shows_undefined_delta() {
        let prices = Arc::new(
            FakePrices::default()
                .script("BTCUSDT", vec![Ok(dec!(50000)), Ok(dec!(50000))])
                .script("LUNAUSDT", vec![Ok(Decimal::ZERO), Ok(dec!(0.01))]),
        );
        let session = Arc::new(RecordingSession::default());
        let mut scheduler = build_scheduler(
            config(vec![pair("BTC", "USDT"), pair("LUNA", "USDT")], FailurePolicy::Abort),
            prices,
            session.clone(),
            Arc::new(ManualClock::default()),
        );

        scheduler.run_cycle().await.unwrap();
        let report = scheduler.run_cycle().await.unwrap();
        assert_eq!(report.notification.fields[0].value(), "$50000.00 ~ [+0.00%]");
        assert_eq!(report.notification.fields[1].value(), "$0.01 ~ [n/a]");
        assert_eq!(
            scheduler.history().last_price(&pair("LUNA", "USDT")),
            Some(dec!(0.01))
        );
    }

    #[tokio::test]
    async fn test_parallel_fetch_keeps_symbol_order() {
        let prices = Arc::new(
            FakePrices::default()
                .script("ETHUSDT", vec![Ok(dec!(3000))])
                .script("BTCUSDT", vec![Ok(dec!(50000))])
                .script("SOLUSDT", vec![Ok(dec!(150))]),
        );
        let mut cfg = config(
            vec![pair("ETH", "USDT"), pair("BTC", "USDT"), pair("SOL", "USDT")],
            FailurePolicy::Skip,
        );
        cfg.parallel_fetch = true;
        let mut scheduler = build_scheduler(
            cfg,
            prices,
            Arc::new(RecordingSession::default()),
            Arc::new(ManualClock::default()),
        );

        let report = scheduler.run_cycle().await.unwrap();
        let names: Vec<&str> = report.notification.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["ETHUSDT", "BTCUSDT", "SOLUSDT"]);
        assert_eq!(scheduler.history().len(), 3);
    }

    #[tokio::test]
    async fn test_parallel_fetch_failure_under_both_policies() {
        let symbols = vec![pair("ETH", "USDT"), pair("FOO", "BAR"), pair("SOL", "USDT")];
        let prices = || {
            Arc::new(
                FakePrices::default()
                    .script("ETHUSDT", vec![Ok(dec!(3000))])
                    .script("SOLUSDT", vec![Ok(dec!(150))]),
            )
        };

        let mut cfg = config(symbols.clone(), FailurePolicy::Skip);
        cfg.parallel_fetch = true;
        let mut lenient = build_scheduler(
            cfg,
            prices(),
            Arc::new(RecordingSession::default()),
            Arc::new(ManualClock::default()),
        );
        let report = lenient.run_cycle().await.unwrap();
        let names: Vec<&str> = report.notification.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["ETHUSDT", "SOLUSDT"]);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].0.key(), "FOOBAR");
        assert_eq!(report.skipped[0].1, FetchError::UnknownSymbol("FOOBAR".to_string()));
        assert!(report.delivered);

        let mut cfg = config(symbols, FailurePolicy::Abort);
        cfg.parallel_fetch = true;
        let strict_prices = prices();
        let session = Arc::new(RecordingSession::default());
        let mut strict = build_scheduler(
            cfg,
            strict_prices.clone(),
            session.clone(),
            Arc::new(ManualClock::default()),
        );
        let err = strict.run_cycle().await.unwrap_err();
        assert!(
            matches!(&err, AppError::Fetch(FetchError::UnknownSymbol(symbol)) if symbol == "FOOBAR"),
            "{:?}",
            err
        );
        // every symbol was requested, nothing recorded or sent
        let mut calls = strict_prices.calls();
        calls.sort();
        assert_eq!(calls, vec!["ETHUSDT", "FOOBAR", "SOLUSDT"]);
        assert!(strict.history().is_empty());
        assert!(session.sent_text().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_failure_keeps_loop_alive_under_skip_policy() {
        let prices = Arc::new(FakePrices::default().script("BTCUSDT", vec![Ok(dec!(1)), Ok(dec!(2))]));
        let session = Arc::new(RecordingSession {
            fail_sends: true,
            ..RecordingSession::default()
        });
        let mut scheduler = build_scheduler(
            config(vec![SymbolPair::default_pair()], FailurePolicy::Skip),
            prices.clone(),
            session.clone(),
            Arc::new(ManualClock::default()),
        );
        let report = scheduler.run_cycle().await.unwrap();
        assert!(!report.delivered);
        // history still advanced
        assert_eq!(scheduler.history().last_price(&SymbolPair::default_pair()), Some(dec!(1)));

        let mut strict = build_scheduler(
            config(vec![SymbolPair::default_pair()], FailurePolicy::Abort),
            prices,
            session,
            Arc::new(ManualClock::default()),
        );
        assert!(matches!(
            strict.run_cycle().await,
            Err(AppError::Dispatch(DispatchError::Rejected { status: 403, .. }))
        ));
    }

    #[tokio::test]
    async fn test_run_sleeps_interval_and_stops_on_shutdown() {
        let prices = Arc::new(
            FakePrices::default().script("BTCUSDT", vec![Ok(dec!(100)), Ok(dec!(110)), Ok(dec!(120))]),
        );
        let (stop, shutdown) = watch::channel(false);
        let session = Arc::new(RecordingSession {
            stop_after: Some((2, stop)),
            ..RecordingSession::default()
        });
        let clock = Arc::new(ManualClock::default());
        let mut scheduler = build_scheduler(
            config(vec![SymbolPair::default_pair()], FailurePolicy::Skip),
            prices,
            session.clone(),
            clock.clone(),
        );

        scheduler.run(shutdown).await.unwrap();

        assert_eq!(scheduler.state(), SchedulerState::Stopped);
        assert_eq!(scheduler.cycles(), 2);
        let sent = session.sent_text();
        assert_eq!(sent.len(), 2);
        assert!(sent[1].ends_with("BTCUSDT: $110.00 ~ [+10.00%]"));
        assert_eq!(clock.sleeps()[0], Duration::from_secs(300));
        assert!(session.presence.lock().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_run_returns_immediately_when_already_shut_down() {
        let session = Arc::new(RecordingSession::default());
        let mut scheduler = build_scheduler(
            config(vec![SymbolPair::default_pair()], FailurePolicy::Skip),
            Arc::new(FakePrices::default()),
            session.clone(),
            Arc::new(ManualClock::default()),
        );
        let (_stop, shutdown) = watch::channel(true);

        scheduler.run(shutdown).await.unwrap();
        assert_eq!(scheduler.cycles(), 0);
        assert!(session.sent_text().is_empty());
    }
}
