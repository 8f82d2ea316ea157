//! Alert gating and engine tuning configuration.

use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

use super::duration;

/// De-duplication settings for forwarded alerts.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Window during which an equivalent opportunity is not re-alerted (default: 5m).
    #[serde(with = "duration")]
    pub cooldown: Duration,
    /// Net spread change, in percent points, still treated as the same alert.
    pub net_epsilon_percent: Decimal,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_secs(300),
            net_epsilon_percent: Decimal::new(5, 2),
        }
    }
}

/// Engine output settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Routes emitted per pair per tick; the rest are logged as superseded.
    pub max_routes_per_pair: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_routes_per_pair: 1,
        }
    }
}

/// Transfer-aware route costing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Subtract withdraw/deposit costs from cross-venue routes.
    pub enabled: bool,
    /// Net spread lost per hour of expected confirmation delay.
    pub eta_penalty_percent_per_hour: Decimal,
}
