//! Quote collection configuration.

use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use super::duration;
use crate::domain::Pair;

/// Quote collection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    /// Quotes older than this are discarded as stale (default: 12s).
    #[serde(default = "default_max_quote_age", with = "duration")]
    pub max_quote_age: Duration,
    /// Maximum in-flight fetches (default: 16).
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Timeout for a single fetch attempt (default: 5s).
    #[serde(default = "default_timeout", with = "duration")]
    pub timeout: Duration,
    /// Retry behavior for transient fetch failures.
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,
    /// Interval between scan ticks (default: 30s).
    #[serde(default = "default_scan_interval", with = "duration")]
    pub scan_interval: Duration,
    #[serde(default)]
    pub fallback_quotes: FallbackQuotesConfig,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            max_quote_age: default_max_quote_age(),
            workers: default_workers(),
            timeout: default_timeout(),
            retry: RetryConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            scan_interval: default_scan_interval(),
            fallback_quotes: FallbackQuotesConfig::default(),
        }
    }
}

fn default_max_quote_age() -> Duration {
    Duration::from_secs(12)
}

fn default_workers() -> usize {
    16
}

fn default_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_scan_interval() -> Duration {
    Duration::from_secs(30)
}

/// Retry settings for failed operations.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first (default: 3).
    pub max_attempts: Option<u32>,
    /// Delay before the first retry (default: 200ms).
    #[serde(default, with = "duration")]
    pub initial_delay: Duration,
    /// Maximum delay between retries (default: 2s).
    #[serde(default, with = "duration")]
    pub max_delay: Duration,
    /// Factor by which delay increases after each retry (default: 2.0).
    pub multiplier: Option<f64>,
}

/// Per-venue circuit breaker settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit (default: 3).
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// How long an open circuit rejects calls (default: 60s).
    #[serde(default = "default_cooldown", with = "duration")]
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            cooldown: default_cooldown(),
        }
    }
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_cooldown() -> Duration {
    Duration::from_secs(60)
}

/// Static quotes used when a venue fails every attempt for a pair.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FallbackQuotesConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub quotes: HashMap<Pair, StaticQuote>,
}

/// Configured top of book.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct StaticQuote {
    pub bid: Decimal,
    pub ask: Decimal,
    #[serde(default)]
    pub bid_size: Decimal,
    #[serde(default)]
    pub ask_size: Decimal,
}
