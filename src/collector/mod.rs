//! Concurrent quote collection for one scan tick.
//!
//! Every (pair, adapter) fetch is an independent unit of work scheduled onto
//! a bounded pool. Each unit runs under its own timeout with retry on
//! transient errors, and passes through the venue's circuit breaker. Failed
//! and stale units are reported, never propagated.

mod circuit;
mod retry;

pub use circuit::{CircuitBreaker, CircuitState};
pub use retry::RetryPolicy;

use chrono::{DateTime, Utc};
use futures_util::future::{BoxFuture, FutureExt};
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{CollectorConfig, StaticQuote};
use crate::domain::{Pair, Quote, QuoteSource};
use crate::venues::{FetchError, VenueAdapter};

/// A (pair, adapter) fetch that produced no usable quote.
#[derive(Debug, Clone, Serialize)]
pub struct FetchFailure {
    pub venue: String,
    pub pair: Pair,
    pub kind: String,
    pub message: String,
    pub attempts: u32,
}

/// Per-venue counters for one tick.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VenueHealth {
    /// Outbound calls made.
    pub attempts: u32,
    pub successes: u32,
    pub errors: u32,
    /// Calls short-circuited by the breaker.
    pub skipped: u32,
    pub stale: u32,
    pub fallbacks: u32,
    pub circuit: Option<CircuitState>,
    pub last_error: Option<String>,
}

/// Best-effort result of one collection pass.
#[derive(Debug, Clone)]
pub struct QuoteSet {
    /// Fresh quotes by pair, then adapter name.
    pub quotes: HashMap<Pair, BTreeMap<String, Quote>>,
    /// Quotes dropped for exceeding the age limit.
    pub stale: Vec<Quote>,
    pub failures: Vec<FetchFailure>,
    pub health: BTreeMap<String, VenueHealth>,
    pub collected_at: DateTime<Utc>,
}

impl QuoteSet {
    pub fn for_pair(&self, pair: &Pair) -> Option<&BTreeMap<String, Quote>> {
        self.quotes.get(pair)
    }

    pub fn get(&self, pair: &Pair, venue: &str) -> Option<&Quote> {
        self.quotes.get(pair).and_then(|q| q.get(venue))
    }

    pub fn quote_count(&self) -> usize {
        self.quotes.values().map(|q| q.len()).sum()
    }
}

struct UnitOutcome {
    venue: String,
    pair: Pair,
    result: Result<Quote, FetchError>,
    attempts: u32,
    skipped: u32,
}

/// QuoteCollector fans fetches out across adapters and owns the per-venue
/// circuit breakers. Breaker state survives across ticks.
pub struct QuoteCollector {
    breakers: Mutex<HashMap<String, CircuitBreaker>>,
}

impl QuoteCollector {
    pub fn new() -> Self {
        Self {
            breakers: Mutex::new(HashMap::new()),
        }
    }

    /// Collects quotes for every pair from every adapter that supports it.
    /// In-flight fetches never exceed `settings.workers`.
    pub async fn collect(
        &self,
        adapters: &[Arc<dyn VenueAdapter>],
        pairs: &[Pair],
        settings: &CollectorConfig,
    ) -> QuoteSet {
        let policy = RetryPolicy::from_config(&settings.retry);
        let units: Vec<(Arc<dyn VenueAdapter>, Pair)> = pairs
            .iter()
            .flat_map(|pair| {
                adapters
                    .iter()
                    .filter(|a| a.supports(pair))
                    .map(move |a| (Arc::clone(a), pair.clone()))
            })
            .collect();

        debug!(units = units.len(), workers = settings.workers, "Collecting quotes");

        let fetches: Vec<BoxFuture<'_, UnitOutcome>> = units
            .into_iter()
            .map(|(adapter, pair)| self.fetch_unit(adapter, pair, settings, &policy).boxed())
            .collect();

        let outcomes: Vec<UnitOutcome> = stream::iter(fetches)
            .buffer_unordered(settings.workers.max(1))
            .collect()
            .await;

        let collected_at = Utc::now();
        let mut set = QuoteSet {
            quotes: HashMap::new(),
            stale: Vec::new(),
            failures: Vec::new(),
            health: BTreeMap::new(),
            collected_at,
        };

        for outcome in outcomes {
            let health = set.health.entry(outcome.venue.clone()).or_default();
            health.attempts += outcome.attempts;
            health.skipped += outcome.skipped;

            match outcome.result {
                Ok(quote) if quote.source == QuoteSource::Fallback => {
                    health.fallbacks += 1;
                    insert_quote(&mut set.quotes, quote);
                }
                Ok(quote) if !quote.is_fresh(collected_at, settings.max_quote_age) => {
                    health.successes += 1;
                    health.stale += 1;
                    debug!(
                        venue = %quote.venue,
                        pair = %quote.pair,
                        age_ms = quote.age(collected_at).as_millis() as u64,
                        "Discarding stale quote"
                    );
                    set.stale.push(quote);
                }
                Ok(quote) => {
                    health.successes += 1;
                    insert_quote(&mut set.quotes, quote);
                }
                Err(e) => {
                    if !matches!(e, FetchError::CircuitOpen(_)) {
                        health.errors += 1;
                    }
                    health.last_error = Some(e.to_string());
                    set.failures.push(FetchFailure {
                        venue: outcome.venue,
                        pair: outcome.pair,
                        kind: e.kind().to_string(),
                        message: e.to_string(),
                        attempts: outcome.attempts,
                    });
                }
            }
        }

        {
            let breakers = self.breakers.lock().unwrap_or_else(PoisonError::into_inner);
            for (venue, health) in set.health.iter_mut() {
                health.circuit = breakers.get(venue).map(|b| b.state());
            }
        }

        set
    }

    async fn fetch_unit(
        &self,
        adapter: Arc<dyn VenueAdapter>,
        pair: Pair,
        settings: &CollectorConfig,
        policy: &RetryPolicy,
    ) -> UnitOutcome {
        let venue = adapter.name().to_string();
        let mut attempts = 0;
        let mut skipped = 0;
        let mut last_error: Option<FetchError> = None;

        let result = loop {
            if !self.acquire(&venue, settings) {
                skipped += 1;
                break Err(last_error.unwrap_or_else(|| FetchError::CircuitOpen(venue.clone())));
            }

            attempts += 1;
            let fetched = match tokio::time::timeout(settings.timeout, adapter.fetch_quote(&pair)).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout(settings.timeout)),
            };

            match fetched {
                Ok(quote) => {
                    self.on_success(&venue);
                    break Ok(quote);
                }
                Err(e) => {
                    debug!(venue = %venue, pair = %pair, attempt = attempts, error = %e, "Fetch attempt failed");
                    self.on_failure(&venue, settings);
                    let retry = e.is_transient() && attempts < policy.max_attempts;
                    if !retry {
                        warn!(venue = %venue, pair = %pair, attempts, error = %e, "Fetch failed");
                        break Err(e);
                    }
                    last_error = Some(e);
                    tokio::time::sleep(policy.delay_for(attempts)).await;
                }
            }
        };

        let result = match result {
            Err(e) if settings.fallback_quotes.enabled => {
                match settings.fallback_quotes.quotes.get(&pair) {
                    Some(fallback) => {
                        info!(venue = %venue, pair = %pair, error = %e, "Using fallback quote");
                        Ok(fallback_quote(&venue, &pair, fallback))
                    }
                    None => Err(e),
                }
            }
            other => other,
        };

        UnitOutcome {
            venue,
            pair,
            result,
            attempts,
            skipped,
        }
    }

    fn acquire(&self, venue: &str, settings: &CollectorConfig) -> bool {
        let mut breakers = self.breakers.lock().unwrap_or_else(PoisonError::into_inner);
        let breaker = breakers
            .entry(venue.to_string())
            .or_insert_with(|| CircuitBreaker::new(&settings.circuit_breaker));
        let was_open = breaker.state() == CircuitState::Open;
        let allowed = breaker.try_acquire(Instant::now());
        if was_open && allowed {
            info!(venue = %venue, "Circuit half-open, sending probe");
        }
        allowed
    }

    fn on_success(&self, venue: &str) {
        let mut breakers = self.breakers.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(breaker) = breakers.get_mut(venue) {
            if breaker.record_success() {
                info!(venue = %venue, "Circuit closed");
            }
        }
    }

    fn on_failure(&self, venue: &str, settings: &CollectorConfig) {
        let mut breakers = self.breakers.lock().unwrap_or_else(PoisonError::into_inner);
        let breaker = breakers
            .entry(venue.to_string())
            .or_insert_with(|| CircuitBreaker::new(&settings.circuit_breaker));
        if breaker.record_failure(Instant::now()) {
            warn!(
                venue = %venue,
                failures = breaker.consecutive_failures(),
                cooldown_secs = settings.circuit_breaker.cooldown.as_secs(),
                "Circuit opened"
            );
        }
    }
}

impl Default for QuoteCollector {
    fn default() -> Self {
        Self::new()
    }
}

fn insert_quote(quotes: &mut HashMap<Pair, BTreeMap<String, Quote>>, quote: Quote) {
    quotes
        .entry(quote.pair.clone())
        .or_default()
        .insert(quote.venue.clone(), quote);
}

fn fallback_quote(venue: &str, pair: &Pair, q: &StaticQuote) -> Quote {
    Quote {
        venue: venue.to_string(),
        pair: pair.clone(),
        bid_price: q.bid,
        bid_size: q.bid_size,
        ask_price: q.ask,
        ask_size: q.ask_size,
        timestamp: Utc::now(),
        source: QuoteSource::Fallback,
    }
}

/// Failure kind counts across a set of failures, for tick summaries.
pub fn failure_counts(failures: &[FetchFailure]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for f in failures {
        *counts.entry(f.kind.clone()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests;
