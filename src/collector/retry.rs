//! Exponential backoff for transient fetch failures.

use std::time::Duration;

use crate::config::RetryConfig;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(200);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(2);
const DEFAULT_MULTIPLIER: f64 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl RetryPolicy {
    /// Resolves unset or zero fields to the defaults (3 attempts, 200ms, 2s, x2).
    pub fn from_config(config: &RetryConfig) -> Self {
        let nonzero = |d: Duration, default: Duration| if d.is_zero() { default } else { d };
        Self {
            max_attempts: config.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS).max(1),
            initial_delay: nonzero(config.initial_delay, DEFAULT_INITIAL_DELAY),
            max_delay: nonzero(config.max_delay, DEFAULT_MAX_DELAY),
            multiplier: config
                .multiplier
                .filter(|m| m.is_finite() && *m >= 1.0)
                .unwrap_or(DEFAULT_MULTIPLIER),
        }
    }

    /// Delay before retry number `retry` (1 for the first retry).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(16) as i32;
        let millis = (self.initial_delay.as_millis() as f64 * self.multiplier.powi(exp)).round();
        let cap = self.max_delay.as_millis() as f64;
        if millis >= cap {
            self.max_delay
        } else {
            Duration::from_millis(millis as u64)
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
