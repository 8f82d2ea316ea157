//! Alert de-duplication.

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

use crate::config::AlertConfig;
use crate::domain::Opportunity;

#[derive(Debug, Clone, Copy)]
struct Alerted {
    net_percent: Decimal,
    at: DateTime<Utc>,
}

/// AlertGate forwards each opportunity once per cooldown window.
///
/// An opportunity is suppressed when the same route was alerted within the
/// cooldown and its net spread moved by no more than the epsilon. A larger
/// move re-alerts and restarts the window.
pub struct AlertGate {
    cooldown: TimeDelta,
    epsilon: Decimal,
    alerted: Mutex<HashMap<String, Alerted>>,
}

impl AlertGate {
    pub fn new(config: &AlertConfig) -> Self {
        Self {
            cooldown: TimeDelta::from_std(config.cooldown).unwrap_or(TimeDelta::MAX),
            epsilon: config.net_epsilon_percent.abs(),
            alerted: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the opportunities to notify about, in input order, and
    /// remembers them. Entries older than the cooldown are forgotten.
    pub fn filter(&self, opportunities: &[Opportunity], now: DateTime<Utc>) -> Vec<Opportunity> {
        let mut alerted = self.alerted.lock().unwrap_or_else(PoisonError::into_inner);
        alerted.retain(|_, a| now - a.at < self.cooldown);

        let mut forwarded = Vec::new();
        for opp in opportunities {
            let key = opp.route.key();
            let suppress = alerted.get(&key).is_some_and(|prev| {
                (opp.net_percent - prev.net_percent).abs() <= self.epsilon
            });
            if suppress {
                debug!(route = %key, net = %opp.net_percent, "Alert suppressed");
                continue;
            }
            alerted.insert(
                key,
                Alerted {
                    net_percent: opp.net_percent,
                    at: now,
                },
            );
            forwarded.push(opp.clone());
        }
        forwarded
    }

    /// Number of routes currently inside their cooldown window.
    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.alerted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Forgets every alerted route.
    #[cfg(test)]
    fn reset(&self) {
        self.alerted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
