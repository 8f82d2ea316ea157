//! Tests for the quote collector.

use super::*;
use crate::config::{CircuitBreakerConfig, RetryConfig};
use async_trait::async_trait;
use chrono::TimeDelta;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// What a mock adapter does on each call.
#[derive(Clone)]
enum Behavior {
    Quote,
    /// Quote timestamped this many seconds in the past.
    Aged(i64),
    Fail(FetchError),
    /// Fails with a 503 for the first n calls, then quotes.
    FailTimes(usize),
    Slow(Duration),
}

/// Mock adapter for testing.
struct MockAdapter {
    name: String,
    behavior: Behavior,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    only: Option<Pair>,
}

impl MockAdapter {
    fn new(name: &str, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            behavior,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            only: None,
        })
    }

    fn only(name: &str, pair: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            behavior: Behavior::Quote,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            only: Some(Pair::parse(pair).unwrap()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn quote(&self, pair: &Pair, age_secs: i64) -> Quote {
        Quote {
            venue: self.name.clone(),
            pair: pair.clone(),
            bid_price: dec!(100),
            bid_size: dec!(1),
            ask_price: dec!(101),
            ask_size: dec!(1),
            timestamp: Utc::now() - TimeDelta::seconds(age_secs),
            source: QuoteSource::Ticker,
        }
    }
}

#[async_trait]
impl VenueAdapter for MockAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports(&self, pair: &Pair) -> bool {
        self.only.as_ref().is_none_or(|p| p == pair)
    }

    async fn fetch_quote(&self, pair: &Pair) -> crate::venues::Result<Quote> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let result = match &self.behavior {
            Behavior::Quote => Ok(self.quote(pair, 0)),
            Behavior::Aged(secs) => Ok(self.quote(pair, *secs)),
            Behavior::Fail(e) => Err(e.clone()),
            Behavior::FailTimes(n) if call < *n => Err(FetchError::Http {
                status: Some(503),
                message: "unavailable".into(),
            }),
            Behavior::FailTimes(_) => Ok(self.quote(pair, 0)),
            Behavior::Slow(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(self.quote(pair, 0))
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

fn settings() -> CollectorConfig {
    CollectorConfig {
        max_quote_age: Duration::from_secs(12),
        workers: 16,
        timeout: Duration::from_millis(500),
        retry: RetryConfig {
            max_attempts: Some(3),
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            multiplier: Some(2.0),
        },
        circuit_breaker: CircuitBreakerConfig {
            failure_threshold: 3,
            cooldown: Duration::from_secs(60),
        },
        ..CollectorConfig::default()
    }
}

fn pairs(symbols: &[&str]) -> Vec<Pair> {
    symbols.iter().map(|s| Pair::parse(s).unwrap()).collect()
}

fn parse_error() -> FetchError {
    FetchError::Parse("bad payload".into())
}

#[tokio::test]
async fn test_partial_results_survive_broken_venue() {
    let good = MockAdapter::new("binance", Behavior::Quote);
    let bad = MockAdapter::new("okx", Behavior::Fail(parse_error()));
    let adapters: Vec<Arc<dyn VenueAdapter>> = vec![good.clone(), bad.clone()];
    let pair = Pair::parse("BTC/USDT").unwrap();

    let set = QuoteCollector::new()
        .collect(&adapters, &[pair.clone()], &settings())
        .await;

    assert!(set.get(&pair, "binance").is_some());
    assert!(set.get(&pair, "okx").is_none());
    assert_eq!(set.failures.len(), 1);
    assert_eq!(set.failures[0].kind, "parse-error");
    // parse errors are not retried
    assert_eq!(bad.calls(), 1);
    assert_eq!(set.health["okx"].errors, 1);
    assert_eq!(set.health["binance"].successes, 1);
}

#[tokio::test]
async fn test_transient_errors_are_retried() {
    let flaky = MockAdapter::new("bybit", Behavior::FailTimes(2));
    let adapters: Vec<Arc<dyn VenueAdapter>> = vec![flaky.clone()];
    let pair = Pair::parse("ETH/USDT").unwrap();

    let set = QuoteCollector::new()
        .collect(&adapters, &[pair.clone()], &settings())
        .await;

    assert!(set.get(&pair, "bybit").is_some());
    assert_eq!(flaky.calls(), 3);
    assert_eq!(set.health["bybit"].attempts, 3);
    assert!(set.failures.is_empty());
}

#[tokio::test]
async fn test_retries_stop_at_max_attempts() {
    let down = MockAdapter::new(
        "bybit",
        Behavior::Fail(FetchError::Http {
            status: Some(502),
            message: "bad gateway".into(),
        }),
    );
    let adapters: Vec<Arc<dyn VenueAdapter>> = vec![down.clone()];
    let mut cfg = settings();
    cfg.circuit_breaker.failure_threshold = 10;

    let set = QuoteCollector::new()
        .collect(&adapters, &pairs(&["ETH/USDT"]), &cfg)
        .await;

    assert_eq!(down.calls(), 3);
    assert_eq!(set.failures[0].kind, "http-error");
    assert_eq!(set.failures[0].attempts, 3);
}

#[tokio::test]
async fn test_circuit_short_circuits_without_network_call() {
    let down = MockAdapter::new("kucoin", Behavior::Fail(parse_error()));
    let adapters: Vec<Arc<dyn VenueAdapter>> = vec![down.clone()];
    let mut cfg = settings();
    cfg.workers = 1;
    cfg.circuit_breaker.failure_threshold = 2;
    let collector = QuoteCollector::new();

    let first = collector
        .collect(&adapters, &pairs(&["BTC/USDT", "ETH/USDT"]), &cfg)
        .await;
    assert_eq!(down.calls(), 2);
    assert_eq!(first.health["kucoin"].circuit, Some(CircuitState::Open));

    let second = collector
        .collect(&adapters, &pairs(&["BTC/USDT", "ETH/USDT"]), &cfg)
        .await;
    assert_eq!(down.calls(), 2);
    assert_eq!(second.failures.len(), 2);
    assert!(second.failures.iter().all(|f| f.kind == "circuit-open"));
    assert_eq!(second.health["kucoin"].skipped, 2);
    assert_eq!(second.health["kucoin"].errors, 0);
}

#[tokio::test]
async fn test_half_open_allows_single_probe() {
    let down = MockAdapter::new("kucoin", Behavior::Fail(parse_error()));
    let adapters: Vec<Arc<dyn VenueAdapter>> = vec![down.clone()];
    let mut cfg = settings();
    cfg.workers = 1;
    cfg.circuit_breaker.failure_threshold = 1;
    cfg.circuit_breaker.cooldown = Duration::from_millis(20);
    let collector = QuoteCollector::new();

    let first = collector.collect(&adapters, &pairs(&["BTC/USDT"]), &cfg).await;
    assert_eq!(down.calls(), 1);
    assert_eq!(first.health["kucoin"].circuit, Some(CircuitState::Open));

    tokio::time::sleep(Duration::from_millis(30)).await;

    let set = collector
        .collect(&adapters, &pairs(&["BTC/USDT", "ETH/USDT", "SOL/USDT"]), &cfg)
        .await;
    assert_eq!(down.calls(), 2);
    assert_eq!(set.health["kucoin"].attempts, 1);
    assert_eq!(set.health["kucoin"].skipped, 2);
    assert_eq!(set.health["kucoin"].circuit, Some(CircuitState::Open));
}

#[tokio::test]
async fn test_stale_quotes_are_discarded() {
    let fresh = MockAdapter::new("binance", Behavior::Quote);
    let old = MockAdapter::new("okx", Behavior::Aged(20));
    let adapters: Vec<Arc<dyn VenueAdapter>> = vec![fresh, old];
    let pair = Pair::parse("BTC/USDT").unwrap();

    let set = QuoteCollector::new()
        .collect(&adapters, &[pair.clone()], &settings())
        .await;

    assert_eq!(set.for_pair(&pair).unwrap().len(), 1);
    assert!(set.get(&pair, "okx").is_none());
    assert_eq!(set.stale.len(), 1);
    assert_eq!(set.stale[0].venue, "okx");
    assert_eq!(set.health["okx"].stale, 1);
}

#[tokio::test]
async fn test_far_future_quote_is_stale() {
    let fresh = MockAdapter::new("binance", Behavior::Quote);
    // clock a minute ahead
    let skewed = MockAdapter::new("okx", Behavior::Aged(-60));
    let adapters: Vec<Arc<dyn VenueAdapter>> = vec![fresh, skewed];
    let pair = Pair::parse("BTC/USDT").unwrap();

    let set = QuoteCollector::new()
        .collect(&adapters, &[pair.clone()], &settings())
        .await;

    assert!(set.get(&pair, "okx").is_none());
    assert_eq!(set.stale.len(), 1);
    assert_eq!(set.health["okx"].stale, 1);
}

#[tokio::test]
async fn test_slow_venue_times_out() {
    let slow = MockAdapter::new("slow", Behavior::Slow(Duration::from_millis(300)));
    let fast = MockAdapter::new("fast", Behavior::Quote);
    let adapters: Vec<Arc<dyn VenueAdapter>> = vec![slow, fast];
    let mut cfg = settings();
    cfg.timeout = Duration::from_millis(20);
    cfg.retry.max_attempts = Some(1);

    let set = QuoteCollector::new()
        .collect(&adapters, &pairs(&["BTC/USDT"]), &cfg)
        .await;

    assert_eq!(set.quote_count(), 1);
    assert_eq!(set.failures.len(), 1);
    assert_eq!(set.failures[0].venue, "slow");
    assert_eq!(set.failures[0].kind, "timeout");
}

#[tokio::test]
async fn test_fallback_quote_used_after_failure() {
    let down = MockAdapter::new("okx", Behavior::Fail(parse_error()));
    let adapters: Vec<Arc<dyn VenueAdapter>> = vec![down];
    let pair = Pair::parse("BTC/USDT").unwrap();
    let mut cfg = settings();
    cfg.fallback_quotes.enabled = true;
    cfg.fallback_quotes.quotes.insert(
        pair.clone(),
        StaticQuote {
            bid: dec!(99),
            ask: dec!(100),
            bid_size: dec!(1),
            ask_size: dec!(1),
        },
    );

    let set = QuoteCollector::new().collect(&adapters, &[pair.clone()], &cfg).await;

    let q = set.get(&pair, "okx").unwrap();
    assert_eq!(q.source, QuoteSource::Fallback);
    assert_eq!(q.ask_price, dec!(100));
    assert!(set.failures.is_empty());
    assert_eq!(set.health["okx"].fallbacks, 1);
}

#[tokio::test]
async fn test_in_flight_bounded_by_workers() {
    let slow = MockAdapter::new("binance", Behavior::Slow(Duration::from_millis(15)));
    let adapters: Vec<Arc<dyn VenueAdapter>> = vec![slow.clone()];
    let mut cfg = settings();
    cfg.workers = 2;

    let set = QuoteCollector::new()
        .collect(
            &adapters,
            &pairs(&["BTC/USDT", "ETH/USDT", "SOL/USDT", "XRP/USDT", "ADA/USDT", "DOT/USDT"]),
            &cfg,
        )
        .await;

    assert_eq!(set.quote_count(), 6);
    assert!(slow.max_in_flight.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn test_unsupported_pairs_are_not_fetched() {
    let p2p = MockAdapter::only("binance:p2p", "USDT/ARS");
    let adapters: Vec<Arc<dyn VenueAdapter>> = vec![p2p.clone()];

    let set = QuoteCollector::new()
        .collect(&adapters, &pairs(&["BTC/USDT", "USDT/ARS"]), &settings())
        .await;

    assert_eq!(p2p.calls(), 1);
    assert_eq!(set.quote_count(), 1);
}

#[test]
fn test_failure_counts() {
    let pair = Pair::parse("BTC/USDT").unwrap();
    let failure = |kind: &str| FetchFailure {
        venue: "x".into(),
        pair: pair.clone(),
        kind: kind.into(),
        message: String::new(),
        attempts: 1,
    };
    let counts = failure_counts(&[failure("timeout"), failure("timeout"), failure("parse-error")]);
    assert_eq!(counts["timeout"], 2);
    assert_eq!(counts["parse-error"], 1);
}

fn assert_send<T: Send>(_: T) {}

#[test]
fn test_collect_future_is_send() {
    let collector = QuoteCollector::new();
    let adapters: Vec<Arc<dyn VenueAdapter>> = vec![MockAdapter::new("binance", Behavior::Quote)];
    let watched = pairs(&["BTC/USDT"]);
    let cfg = settings();

    assert_send(collector.collect(&adapters, &watched, &cfg));
}

#[tokio::test]
async fn test_collect_runs_on_spawned_task() {
    let adapter = MockAdapter::new("binance", Behavior::Quote);
    let adapters: Vec<Arc<dyn VenueAdapter>> = vec![adapter.clone()];
    let collector = Arc::new(QuoteCollector::new());

    let task = {
        let collector = Arc::clone(&collector);
        tokio::spawn(async move {
            collector
                .collect(&adapters, &pairs(&["BTC/USDT", "ETH/USDT"]), &settings())
                .await
        })
    };

    let set = task.await.unwrap();
    assert_eq!(set.quote_count(), 2);
    assert_eq!(adapter.calls(), 2);
}
