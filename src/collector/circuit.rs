//! Per-venue circuit breaker.

use serde::Serialize;
use std::time::{Duration, Instant};

use crate::config::CircuitBreakerConfig;

/// Breaker state as reported in venue health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// CircuitBreaker counts consecutive failures of one venue.
///
/// Closed: every call passes. After `failure_threshold` consecutive failures
/// the breaker opens and rejects calls until `cooldown` has elapsed. The first
/// call after that is the single half-open probe; other calls are rejected
/// until the probe reports back. A successful probe closes the breaker, a
/// failed one re-opens it for another cooldown.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    state: CircuitState,
    failures: u32,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
    failure_threshold: u32,
    cooldown: Duration,
}

impl CircuitBreaker {
    pub fn new(config: &CircuitBreakerConfig) -> Self {
        Self {
            state: CircuitState::Closed,
            failures: 0,
            opened_at: None,
            probe_in_flight: false,
            failure_threshold: config.failure_threshold.max(1),
            cooldown: config.cooldown,
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.failures
    }

    /// Returns true if a call may go out at `now`.
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        match self.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let cooled = self
                    .opened_at
                    .is_none_or(|at| now.saturating_duration_since(at) >= self.cooldown);
                if cooled {
                    self.state = CircuitState::HalfOpen;
                    self.probe_in_flight = true;
                }
                cooled
            }
            CircuitState::HalfOpen => {
                if self.probe_in_flight {
                    false
                } else {
                    self.probe_in_flight = true;
                    true
                }
            }
        }
    }

    /// Records a successful call. Returns true if this closed the breaker.
    pub fn record_success(&mut self) -> bool {
        let recovered = self.state != CircuitState::Closed;
        self.state = CircuitState::Closed;
        self.failures = 0;
        self.opened_at = None;
        self.probe_in_flight = false;
        recovered
    }

    /// Records a failed call. Returns true if this opened the breaker.
    pub fn record_failure(&mut self, now: Instant) -> bool {
        self.failures = self.failures.saturating_add(1);
        match self.state {
            CircuitState::HalfOpen => {
                self.open(now);
                true
            }
            CircuitState::Closed if self.failures >= self.failure_threshold => {
                self.open(now);
                true
            }
            _ => false,
        }
    }

    fn open(&mut self, now: Instant) {
        self.state = CircuitState::Open;
        self.opened_at = Some(now);
        self.probe_in_flight = false;
    }
}
