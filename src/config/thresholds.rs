//! Alert threshold bounds.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Net-spread threshold bounds, in percent.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Lower bound for the dynamic threshold.
    pub min_percent: Decimal,
    /// Starting threshold before any history exists.
    pub base_percent: Decimal,
    /// Upper bound for the dynamic threshold.
    pub max_percent: Decimal,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            min_percent: Decimal::new(1, 1),
            base_percent: Decimal::new(8, 1),
            max_percent: Decimal::new(5, 0),
        }
    }
}

impl ThresholdConfig {
    /// Clamps `value` into `[min_percent, max_percent]`.
    pub fn clamp(&self, value: Decimal) -> Decimal {
        value.max(self.min_percent).min(self.max_percent)
    }
}
