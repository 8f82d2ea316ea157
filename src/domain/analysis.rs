//! Historical analysis results.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// BacktestReport summarizes a replay of history against a threshold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    /// Threshold the rows were filtered with.
    pub threshold: Decimal,
    /// Rows at or above the threshold.
    pub total_trades: usize,
    pub profitable_trades: usize,
    pub cumulative_pnl: Decimal,
    pub average_pnl: Decimal,
    /// profitable / total, 0 when nothing passed.
    pub success_rate: Decimal,
    pub average_effective_percent: Decimal,
}

/// AnalysisState is the process-wide analysis snapshot, replaced as a whole
/// on every successful recompute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisState {
    pub rows_considered: usize,
    pub success_rate: Decimal,
    pub average_net_percent: Decimal,
    pub average_effective_percent: Decimal,
    /// Always within the configured threshold bounds.
    pub recommended_threshold: Decimal,
    /// Threshold the engine filters with; equals the recommendation only
    /// once a backtest validated it.
    pub active_threshold: Decimal,
    pub pair_volatility: BTreeMap<String, Decimal>,
    pub max_volatility: Decimal,
    pub backtest: BacktestReport,
    pub validated: bool,
    pub computed_at: Option<DateTime<Utc>>,
}

impl AnalysisState {
    /// Starting state before any history has been analyzed.
    pub fn initial(base_threshold: Decimal) -> Self {
        Self {
            rows_considered: 0,
            success_rate: Decimal::ZERO,
            average_net_percent: Decimal::ZERO,
            average_effective_percent: Decimal::ZERO,
            recommended_threshold: base_threshold,
            active_threshold: base_threshold,
            pair_volatility: BTreeMap::new(),
            max_volatility: Decimal::ZERO,
            backtest: BacktestReport::default(),
            validated: false,
            computed_at: None,
        }
    }

    pub fn volatility_for(&self, pair: &str) -> Decimal {
        self.pair_volatility
            .get(pair)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }
}
