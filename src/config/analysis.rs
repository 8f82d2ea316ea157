//! Historical analysis configuration.

use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

use super::duration;

/// Dynamic threshold settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Only rows newer than this are analyzed; zero means all history.
    #[serde(with = "duration")]
    pub lookback: Duration,
    /// Share of historical signals the threshold should keep above it.
    pub target_success_rate: Decimal,
    /// How strongly the success-rate gap moves the threshold.
    pub adjust_multiplier: Decimal,
    /// Backtest success rate a recommendation needs before it is activated.
    pub min_backtest_success_rate: Decimal,
    pub execution_costs: ExecutionCostsConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            lookback: Duration::ZERO,
            target_success_rate: Decimal::new(6, 1),
            adjust_multiplier: Decimal::new(4, 1),
            min_backtest_success_rate: Decimal::new(5, 1),
            execution_costs: ExecutionCostsConfig::default(),
        }
    }
}

/// Execution cost model used for effective net spreads.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExecutionCostsConfig {
    pub slippage_bps: Decimal,
    pub rebalance_bps: Decimal,
    pub latency_seconds: Decimal,
    pub latency_penalty_multiplier: Decimal,
}
