//! Tests for the scan coordinator.

use super::*;
use crate::domain::{DiscardReason, OpportunityKind, OpportunityRecord, Quote, QuoteSource};
use crate::notification::{EventType, NotificationError};
use crate::storage::{MemoryLog, StorageError};
use crate::venues::{FetchError, VenueAdapter};
use async_trait::async_trait;
use rust_decimal_macros::dec;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Mock adapter quoting the same book for every pair, or failing.
struct MockAdapter {
    name: String,
    bid: Decimal,
    ask: Decimal,
    fail: bool,
    calls: AtomicUsize,
}

impl MockAdapter {
    fn quoting(name: &str, bid: Decimal, ask: Decimal) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            bid,
            ask,
            fail: false,
            calls: AtomicUsize::new(0),
        })
    }

    fn failing(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            bid: Decimal::ZERO,
            ask: Decimal::ZERO,
            fail: true,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl VenueAdapter for MockAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_quote(&self, pair: &Pair) -> crate::venues::Result<Quote> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(FetchError::Http {
                status: Some(503),
                message: "unavailable".into(),
            });
        }
        Ok(Quote {
            venue: self.name.clone(),
            pair: pair.clone(),
            bid_price: self.bid,
            bid_size: dec!(1000),
            ask_price: self.ask,
            ask_size: dec!(1000),
            timestamp: Utc::now(),
            source: QuoteSource::Ticker,
        })
    }
}

/// Notifier recording the type of every event it receives.
#[derive(Default)]
struct RecordingNotifier {
    events: StdMutex<Vec<EventType>>,
}

impl RecordingNotifier {
    fn count(&self, event_type: EventType) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|t| **t == event_type)
            .count()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, event: &Event) -> Result<(), NotificationError> {
        self.events.lock().unwrap().push(event.event_type);
        Ok(())
    }

    fn send_async(&self, event: Event) {
        self.events.lock().unwrap().push(event.event_type);
    }

    fn is_enabled(&self, _event_type: EventType) -> bool {
        true
    }

    async fn close(&self) -> Result<(), NotificationError> {
        Ok(())
    }
}

fn config(extra: &str) -> Config {
    let yaml = format!(
        r#"
app:
  name: scout
pairs:
  - BTC/USDT
venues:
  binance:
    enabled: true
  okx:
    enabled: true
collector:
  scan_interval: 100ms
  retry:
    max_attempts: 1
{}
"#,
        extra
    );
    serde_yaml::from_str(&yaml).unwrap()
}

struct Harness {
    scanner: Arc<Scanner>,
    log: Arc<MemoryLog>,
    notifier: Arc<RecordingNotifier>,
}

async fn harness(cfg: Config, adapters: Vec<Arc<MockAdapter>>) -> Harness {
    let registry = AdapterRegistry::new();
    for adapter in adapters {
        registry.register(adapter).await;
    }
    let log = Arc::new(MemoryLog::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let scanner = Scanner::with_parts(
        ScannerConfig::new(cfg),
        registry,
        log.clone(),
        notifier.clone(),
    );
    Harness {
        scanner: Arc::new(scanner),
        log,
        notifier,
    }
}

/// binance asks 100.00, okx bids 101.20: one spot route netting 1.0%.
async fn profitable() -> Harness {
    harness(
        config(""),
        vec![
            MockAdapter::quoting("binance", dec!(99.90), dec!(100.00)),
            MockAdapter::quoting("okx", dec!(101.20), dec!(101.30)),
        ],
    )
    .await
}

// ==================== Tick tests ====================

#[tokio::test]
async fn test_tick_detects_alerts_and_logs() {
    let h = profitable().await;

    let report = h.scanner.run_tick().await.unwrap();

    assert_eq!(report.quotes, 2);
    assert_eq!(report.opportunities, 1);
    assert_eq!(report.alerts, 1);
    assert_eq!(report.logged, 1);
    assert_eq!(report.threshold, dec!(0.8));
    // no history before the first tick
    assert!(!report.analysis_updated);

    assert_eq!(h.notifier.count(EventType::Opportunity), 1);
    assert_eq!(h.log.count().await.unwrap(), 1);

    let snapshot = h.scanner.snapshot().await;
    assert_eq!(snapshot.stats.ticks, 1);
    assert_eq!(snapshot.stats.alerts_sent, 1);
    assert_eq!(snapshot.recent.len(), 1);
    assert_eq!(snapshot.recent[0].kind, OpportunityKind::Spot);
    assert_eq!(snapshot.recent[0].net_percent, dec!(1.0));
    assert!(snapshot.health.contains_key("binance"));
    assert!(snapshot.health.contains_key("okx"));
    assert!(snapshot.last_error.is_none());
}

#[tokio::test]
async fn test_repeat_alert_is_gated_but_still_logged() {
    let h = profitable().await;

    h.scanner.run_tick().await.unwrap();
    // decision ids have millisecond resolution
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = h.scanner.run_tick().await.unwrap();

    assert_eq!(second.opportunities, 1);
    assert_eq!(second.alerts, 0);
    assert_eq!(second.logged, 1);
    // the first tick's row is history now
    assert!(second.analysis_updated);

    assert_eq!(h.notifier.count(EventType::Opportunity), 1);
    assert_eq!(h.log.count().await.unwrap(), 2);

    let snapshot = h.scanner.snapshot().await;
    assert_eq!(snapshot.stats.ticks, 2);
    assert_eq!(snapshot.stats.opportunities_detected, 2);
    assert_eq!(snapshot.stats.alerts_sent, 1);
    assert!(snapshot.analysis.computed_at.is_some());
}

#[tokio::test]
async fn test_failed_venue_does_not_abort_tick() {
    let h = harness(
        config(""),
        vec![
            MockAdapter::quoting("binance", dec!(99.90), dec!(100.00)),
            MockAdapter::failing("okx"),
        ],
    )
    .await;

    let report = h.scanner.run_tick().await.unwrap();

    assert_eq!(report.quotes, 1);
    assert_eq!(report.failures, 1);
    assert_eq!(report.opportunities, 0);
    assert_eq!(report.discards, 1);

    let history = h.log.history(None).await.unwrap();
    assert_eq!(
        history[0].discard_reason,
        Some(DiscardReason::InsufficientVenues)
    );

    let snapshot = h.scanner.snapshot().await;
    assert_eq!(snapshot.health["okx"].errors, 1);
    assert_eq!(snapshot.stats.fetch_failures, 1);
}

#[tokio::test]
async fn test_invalid_config_fails_tick_and_is_surfaced_once() {
    let mut cfg = config("");
    cfg.thresholds.min_percent = dec!(2);
    let h = harness(
        cfg,
        vec![
            MockAdapter::quoting("binance", dec!(99.90), dec!(100.00)),
            MockAdapter::quoting("okx", dec!(101.20), dec!(101.30)),
        ],
    )
    .await;

    for _ in 0..2 {
        let err = h.scanner.run_tick().await.unwrap_err();
        assert!(matches!(err, ScanError::InvalidConfig(_)));
    }

    assert_eq!(h.notifier.count(EventType::Error), 1);
    assert_eq!(h.log.count().await.unwrap(), 0);

    let snapshot = h.scanner.snapshot().await;
    assert_eq!(snapshot.stats.ticks, 2);
    assert_eq!(snapshot.stats.failed_ticks, 2);
    assert!(snapshot.last_error.unwrap().contains("thresholds"));
}

#[tokio::test]
async fn test_triangle_legs_are_collected() {
    let binance = MockAdapter::quoting("binance", dec!(99.90), dec!(100.00));
    let okx = MockAdapter::quoting("okx", dec!(101.20), dec!(101.30));
    let h = harness(
        config(
            r#"
triangular_routes:
  - name: usdt-btc-eth
    venue: binance
    legs:
      - { pair: BTC/USDT, action: BUY_BASE }
      - { pair: ETH/BTC, action: BUY_BASE }
      - { pair: ETH/USDT, action: SELL_BASE }
"#,
        ),
        vec![binance.clone(), okx.clone()],
    )
    .await;

    h.scanner.run_tick().await.unwrap();

    // BTC/USDT, ETH/BTC and ETH/USDT, once each
    assert_eq!(binance.calls.load(Ordering::SeqCst), 3);
    assert_eq!(okx.calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_tick_pairs_dedups_in_order() {
    let mut cfg = config(
        r#"
triangular_routes:
  - name: usdt-btc-eth
    venue: binance
    legs:
      - { pair: BTC/USDT, action: BUY_BASE }
      - { pair: ETH/BTC, action: BUY_BASE }
      - { pair: ETH/USDT, action: SELL_BASE }
"#,
    );
    cfg.pairs = vec!["ETH/USDT".into(), "BTC/USDT".into(), "ETH/USDT".into()];

    let (pairs, fetch_pairs) = tick_pairs(&cfg).unwrap();
    let names = |p: &[Pair]| p.iter().map(|p| p.to_string()).collect::<Vec<_>>();

    assert_eq!(names(&pairs), vec!["ETH/USDT", "BTC/USDT"]);
    assert_eq!(names(&fetch_pairs), vec!["ETH/USDT", "BTC/USDT", "ETH/BTC"]);
}

// ==================== Analysis tests ====================

/// Decision log that accepts writes but cannot read its history back.
#[derive(Default)]
struct UnreadableLog {
    inner: MemoryLog,
}

#[async_trait]
impl OpportunityLog for UnreadableLog {
    async fn append(&self, records: &[OpportunityRecord]) -> Result<usize, StorageError> {
        self.inner.append(records).await
    }

    async fn history(
        &self,
        _since: Option<DateTime<Utc>>,
    ) -> Result<Vec<OpportunityRecord>, StorageError> {
        Err(StorageError::InvalidData("corrupt row".into()))
    }

    async fn record_outcome(&self, id: &str, realized: Decimal) -> Result<(), StorageError> {
        self.inner.record_outcome(id, realized).await
    }

    async fn count(&self) -> Result<i64, StorageError> {
        self.inner.count().await
    }

    async fn close(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

/// Appends a copy of the first emitted row with its net spread missing.
async fn append_malformed_row(log: &MemoryLog) {
    let mut row = log.history(None).await.unwrap()[0].clone();
    row.id = "malformed".into();
    row.spread_net = None;
    assert_eq!(log.append(&[row]).await.unwrap(), 1);
}

#[tokio::test]
async fn test_unreadable_history_keeps_initial_analysis() {
    let registry = AdapterRegistry::new();
    registry
        .register(MockAdapter::quoting("binance", dec!(99.90), dec!(100.00)))
        .await;
    registry
        .register(MockAdapter::quoting("okx", dec!(101.20), dec!(101.30)))
        .await;
    let log = Arc::new(UnreadableLog::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let scanner = Scanner::with_parts(ScannerConfig::new(config("")), registry, log.clone(), notifier);
    let before = scanner.snapshot().await.analysis;

    scanner.run_tick().await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = scanner.run_tick().await.unwrap();

    assert!(!second.analysis_updated);
    assert_eq!(second.threshold, dec!(0.8));
    assert_eq!(second.logged, 1);
    assert_eq!(log.count().await.unwrap(), 2);

    let snapshot = scanner.snapshot().await;
    assert_eq!(snapshot.analysis, before);
    assert_eq!(snapshot.stats.ticks, 2);
    assert_eq!(snapshot.stats.failed_ticks, 0);
    assert!(snapshot.last_error.is_none());
}

#[tokio::test]
async fn test_malformed_history_keeps_previous_analysis() {
    let h = profitable().await;

    h.scanner.run_tick().await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = h.scanner.run_tick().await.unwrap();
    assert!(second.analysis_updated);
    let analyzed = h.scanner.snapshot().await.analysis;
    assert!(analyzed.computed_at.is_some());

    append_malformed_row(&h.log).await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    let third = h.scanner.run_tick().await.unwrap();

    assert!(!third.analysis_updated);
    assert_eq!(third.threshold, analyzed.active_threshold);

    let snapshot = h.scanner.snapshot().await;
    assert_eq!(snapshot.analysis, analyzed);
    assert_eq!(snapshot.stats.ticks, 3);
    assert_eq!(snapshot.stats.failed_ticks, 0);
}

#[tokio::test]
async fn test_backtest_replays_logged_history() {
    let h = profitable().await;
    h.scanner.run_tick().await.unwrap();

    let loose = h.scanner.backtest(dec!(0.5)).await.unwrap();
    assert_eq!(loose.threshold, dec!(0.5));
    assert_eq!(loose.total_trades, 1);

    let strict = h.scanner.backtest(dec!(2)).await.unwrap();
    assert_eq!(strict.total_trades, 0);
    assert_eq!(strict.success_rate, Decimal::ZERO);

    // backtesting never touches the active analysis
    assert_eq!(
        h.scanner.snapshot().await.analysis,
        AnalysisState::initial(dec!(0.8))
    );
}

#[tokio::test]
async fn test_backtest_surfaces_malformed_history() {
    let h = profitable().await;
    h.scanner.run_tick().await.unwrap();
    append_malformed_row(&h.log).await;

    let err = h.scanner.backtest(dec!(0.5)).await.unwrap_err();
    assert!(matches!(
        err,
        ScanError::Analysis(AnalysisError::MalformedRow { .. })
    ));
}

// ==================== Settings tests ====================

#[tokio::test]
async fn test_apply_settings_raises_threshold() {
    let h = profitable().await;

    let revision = h
        .scanner
        .apply_settings(SettingsUpdate {
            base_threshold: Some(dec!(2)),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(revision, 1);

    let snapshot = h.scanner.snapshot().await;
    assert_eq!(snapshot.base_threshold, dec!(2));
    assert_eq!(snapshot.analysis.active_threshold, dec!(2));

    let report = h.scanner.run_tick().await.unwrap();
    assert_eq!(report.threshold, dec!(2));
    assert_eq!(report.opportunities, 0);
}

#[tokio::test]
async fn test_apply_settings_pairs_and_capital() {
    let binance = MockAdapter::quoting("binance", dec!(99.90), dec!(100.00));
    let okx = MockAdapter::quoting("okx", dec!(101.20), dec!(101.30));
    let h = harness(config(""), vec![binance.clone(), okx.clone()]).await;

    h.scanner
        .apply_settings(SettingsUpdate {
            pairs: Some(vec!["BTC/USDT".into(), "ETH/USDT".into()]),
            capital: Some(dec!(5000)),
            ..Default::default()
        })
        .await
        .unwrap();

    let report = h.scanner.run_tick().await.unwrap();
    assert_eq!(binance.calls.load(Ordering::SeqCst), 2);
    assert_eq!(report.opportunities, 2);

    let snapshot = h.scanner.snapshot().await;
    assert_eq!(snapshot.capital, dec!(5000));
    assert!(snapshot.recent.iter().all(|o| o.capital == dec!(5000)));
}

#[tokio::test]
async fn test_invalid_settings_change_nothing() {
    let h = profitable().await;

    let err = h
        .scanner
        .apply_settings(SettingsUpdate {
            pairs: Some(vec![]),
            capital: Some(dec!(1)),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ScanError::InvalidConfig(_)));

    let err = h
        .scanner
        .apply_settings(SettingsUpdate {
            base_threshold: Some(dec!(50)),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ScanError::InvalidConfig(_)));

    let snapshot = h.scanner.snapshot().await;
    assert_eq!(snapshot.revision, 0);
    assert_eq!(snapshot.pairs, vec!["BTC/USDT"]);
    assert_eq!(snapshot.capital, dec!(10000));
    assert_eq!(snapshot.base_threshold, dec!(0.8));
}

#[tokio::test]
async fn test_empty_settings_update_is_noop() {
    let h = profitable().await;
    let revision = h
        .scanner
        .apply_settings(SettingsUpdate::default())
        .await
        .unwrap();
    assert_eq!(revision, 0);
}

#[tokio::test]
async fn test_record_outcome_unknown_id() {
    let h = profitable().await;
    let err = h
        .scanner
        .record_outcome("missing", dec!(0.5))
        .await
        .unwrap_err();
    assert!(matches!(err, ScanError::Storage(StorageError::NotFound(_))));
}

// ==================== Lifecycle tests ====================

#[tokio::test]
async fn test_start_and_stop() {
    let h = profitable().await;
    let scanner = h.scanner.clone();
    let handle = tokio::spawn(async move { scanner.start().await });

    tokio::time::sleep(Duration::from_millis(350)).await;
    assert!(h.scanner.is_running().await);
    assert!(matches!(
        h.scanner.start().await,
        Err(ScanError::AlreadyRunning)
    ));

    h.scanner.stop().await;
    handle.await.unwrap().unwrap();

    assert!(!h.scanner.is_running().await);
    assert!(h.scanner.snapshot().await.stats.ticks >= 1);
    assert_eq!(h.notifier.count(EventType::Startup), 1);
    assert_eq!(h.notifier.count(EventType::Shutdown), 1);
    assert_eq!(h.notifier.count(EventType::Overview), 0);
}

#[tokio::test]
async fn test_stop_when_idle_is_noop() {
    let h = profitable().await;
    h.scanner.stop().await;
    assert!(!h.scanner.is_running().await);
    assert_eq!(h.notifier.count(EventType::Shutdown), 0);
}

#[test]
fn test_overview_interval_default() {
    let cfg = config("");
    assert_eq!(overview_interval(&cfg), DEFAULT_OVERVIEW_INTERVAL);
}
