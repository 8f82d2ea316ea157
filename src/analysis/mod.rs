//! Historical analysis: pair volatility, backtests and the dynamic threshold.
//!
//! Input is the decision log; only emitted rows count as history. Each row's
//! effective net is its realized net when the operator recorded one, and
//! otherwise the logged net minus the modeled execution cost.

mod error;

pub use error::AnalysisError;

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, MathematicalOps};
use std::collections::BTreeMap;

use crate::config::{AnalysisConfig, Config, ExecutionCostsConfig, ThresholdConfig};
use crate::domain::{AnalysisState, BacktestReport, OpportunityRecord};

/// One emitted history row reduced to what analysis needs.
#[derive(Debug, Clone, PartialEq)]
struct Sample {
    pair: String,
    net: Decimal,
    realized: Option<Decimal>,
}

/// HistoricalAnalyzer recomputes `AnalysisState` from the decision log.
#[derive(Debug, Clone)]
pub struct HistoricalAnalyzer {
    settings: AnalysisConfig,
    bounds: ThresholdConfig,
    capital: Decimal,
}

impl HistoricalAnalyzer {
    pub fn new(config: &Config) -> Self {
        Self {
            settings: config.analysis.clone(),
            bounds: config.thresholds.clone(),
            capital: config.capital.quote_amount,
        }
    }

    /// Oldest row timestamp worth loading at `now`, or None for all history.
    pub fn window_start(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.settings.lookback.is_zero() {
            return None;
        }
        let lookback = TimeDelta::from_std(self.settings.lookback).ok()?;
        now.checked_sub_signed(lookback)
    }

    /// Recomputes the analysis state, starting from `base_threshold`.
    ///
    /// The recommendation only becomes the active threshold when a backtest
    /// at the recommended value passes at least one row and reaches
    /// `min_backtest_success_rate`; otherwise the clamped base stays active.
    pub fn analyze(
        &self,
        history: &[OpportunityRecord],
        base_threshold: Decimal,
        now: DateTime<Utc>,
    ) -> Result<AnalysisState, AnalysisError> {
        let samples = self.samples(history, now)?;
        if samples.is_empty() {
            return Err(AnalysisError::EmptyHistory);
        }

        let (pair_volatility, max_volatility) = pair_volatility(&samples);
        let effective: Vec<Decimal> = samples
            .iter()
            .map(|s| self.effective_net(s, &pair_volatility))
            .collect();
        let nets: Vec<Decimal> = samples.iter().map(|s| s.net).collect();

        let replay = self.replay(samples.iter().zip(&effective), Decimal::ZERO);
        let recommended =
            self.compute_dynamic_threshold(&nets, &effective, replay.success_rate, base_threshold);

        let backtest = self.replay(
            samples
                .iter()
                .zip(&effective)
                .filter(|(s, _)| s.net >= recommended),
            recommended,
        );
        let validated = backtest.total_trades > 0
            && backtest.success_rate >= self.settings.min_backtest_success_rate;
        let active_threshold = if validated {
            recommended
        } else {
            self.bounds.clamp(base_threshold)
        };

        Ok(AnalysisState {
            rows_considered: samples.len(),
            success_rate: replay.success_rate,
            average_net_percent: mean(&nets),
            average_effective_percent: replay.average_effective_percent,
            recommended_threshold: recommended,
            active_threshold,
            pair_volatility,
            max_volatility,
            backtest,
            validated,
            computed_at: Some(now),
        })
    }

    /// Replays history against a candidate threshold: rows whose logged net
    /// reaches the candidate are counted as trades and scored on their
    /// effective net.
    pub fn backtest(
        &self,
        candidate: Decimal,
        history: &[OpportunityRecord],
        now: DateTime<Utc>,
    ) -> Result<BacktestReport, AnalysisError> {
        let samples = self.samples(history, now)?;
        let (volatility, _) = pair_volatility(&samples);
        let effective: Vec<Decimal> = samples
            .iter()
            .map(|s| self.effective_net(s, &volatility))
            .collect();

        Ok(self.replay(
            samples
                .iter()
                .zip(&effective)
                .filter(|(s, _)| s.net >= candidate),
            candidate,
        ))
    }

    /// Blends a success-rate correction of `current` with the historical net
    /// quantile that keeps the target share of signals above it, padded by
    /// the average execution penalty. Empty input returns `current` clamped
    /// to the configured bounds.
    pub fn compute_dynamic_threshold(
        &self,
        nets: &[Decimal],
        effective: &[Decimal],
        success_rate: Decimal,
        current: Decimal,
    ) -> Decimal {
        if nets.is_empty() {
            return self.bounds.clamp(current);
        }

        let target = self.settings.target_success_rate;
        let mut sorted = nets.to_vec();
        sorted.sort();

        let n = Decimal::from(sorted.len());
        let idx = ((Decimal::ONE - target) * n)
            .floor()
            .to_usize()
            .unwrap_or(0)
            .min(sorted.len() - 1);
        let quantile = sorted[idx];

        let penalties: Vec<Decimal> = nets
            .iter()
            .zip(effective)
            .map(|(net, eff)| *net - *eff)
            .collect();
        let candidate = quantile + mean(&penalties).max(Decimal::ZERO);

        let adjusted = current - (success_rate - target) * self.settings.adjust_multiplier;
        let half = Decimal::new(5, 1);
        self.bounds.clamp(half * adjusted + half * candidate)
    }

    fn samples(
        &self,
        history: &[OpportunityRecord],
        now: DateTime<Utc>,
    ) -> Result<Vec<Sample>, AnalysisError> {
        let since = self.window_start(now);
        let mut samples = Vec::new();
        for record in history.iter().filter(|r| r.is_emitted()) {
            if since.is_some_and(|s| record.timestamp < s) {
                continue;
            }
            let net = record.spread_net.ok_or_else(|| AnalysisError::MalformedRow {
                id: record.id.clone(),
                reason: "emitted row without net spread".into(),
            })?;
            if record.pair.is_empty() {
                return Err(AnalysisError::MalformedRow {
                    id: record.id.clone(),
                    reason: "empty pair".into(),
                });
            }
            samples.push(Sample {
                pair: record.pair.clone(),
                net,
                realized: record.realized_net_percent,
            });
        }
        Ok(samples)
    }

    fn effective_net(&self, sample: &Sample, volatility: &BTreeMap<String, Decimal>) -> Decimal {
        match sample.realized {
            Some(realized) => realized,
            None => effective_net_percent(
                sample.net,
                volatility.get(&sample.pair).copied().unwrap_or_default(),
                &self.settings.execution_costs,
            ),
        }
    }

    fn replay<'s>(
        &self,
        rows: impl Iterator<Item = (&'s Sample, &'s Decimal)>,
        threshold: Decimal,
    ) -> BacktestReport {
        let mut total = 0usize;
        let mut profitable = 0usize;
        let mut cumulative = Decimal::ZERO;
        let mut effective_sum = Decimal::ZERO;

        for (_, eff) in rows {
            let pnl = self.capital * *eff / Decimal::ONE_HUNDRED;
            total += 1;
            cumulative += pnl;
            effective_sum += *eff;
            if pnl > Decimal::ZERO {
                profitable += 1;
            }
        }

        if total == 0 {
            return BacktestReport {
                threshold,
                ..BacktestReport::default()
            };
        }
        let n = Decimal::from(total);
        BacktestReport {
            threshold,
            total_trades: total,
            profitable_trades: profitable,
            cumulative_pnl: cumulative,
            average_pnl: cumulative / n,
            success_rate: Decimal::from(profitable) / n,
            average_effective_percent: effective_sum / n,
        }
    }
}

/// Net spread after slippage, rebalance and the volatility-scaled latency
/// penalty.
pub fn effective_net_percent(
    net: Decimal,
    pair_volatility: Decimal,
    costs: &ExecutionCostsConfig,
) -> Decimal {
    let mut penalty = (costs.slippage_bps + costs.rebalance_bps) / Decimal::ONE_HUNDRED;
    if pair_volatility > Decimal::ZERO
        && costs.latency_seconds > Decimal::ZERO
        && costs.latency_penalty_multiplier > Decimal::ZERO
    {
        penalty += pair_volatility * (costs.latency_seconds / Decimal::from(60))
            * costs.latency_penalty_multiplier;
    }
    net - penalty
}

/// Population standard deviation; zero for fewer than two values.
pub fn pstdev(values: &[Decimal]) -> Decimal {
    if values.len() < 2 {
        return Decimal::ZERO;
    }
    let avg = mean(values);
    let variance = values
        .iter()
        .map(|v| (*v - avg) * (*v - avg))
        .sum::<Decimal>()
        / Decimal::from(values.len());
    variance.sqrt().unwrap_or(Decimal::ZERO)
}

fn mean(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    values.iter().copied().sum::<Decimal>() / Decimal::from(values.len())
}

fn pair_volatility(samples: &[Sample]) -> (BTreeMap<String, Decimal>, Decimal) {
    let mut per_pair: BTreeMap<String, Vec<Decimal>> = BTreeMap::new();
    for s in samples {
        per_pair.entry(s.pair.clone()).or_default().push(s.net);
    }

    let mut max = Decimal::ZERO;
    let volatility = per_pair
        .into_iter()
        .map(|(pair, nets)| {
            let vol = pstdev(&nets);
            max = max.max(vol);
            (pair, vol)
        })
        .collect();
    (volatility, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DiscardReason, OpportunityKind};
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn analyzer(settings: AnalysisConfig) -> HistoricalAnalyzer {
        HistoricalAnalyzer {
            settings,
            bounds: ThresholdConfig::default(),
            capital: dec!(10000),
        }
    }

    fn row(pair: &str, net: Decimal, at: DateTime<Utc>) -> OpportunityRecord {
        OpportunityRecord {
            id: format!("{}-{}", pair, net),
            timestamp: at,
            kind: OpportunityKind::Spot,
            pair: pair.into(),
            route: format!("{}:a->b", pair),
            venues: vec!["a".into(), "b".into()],
            spread_gross: Some(net + dec!(0.2)),
            spread_net: Some(net),
            simulated_pnl: Some(net * dec!(100)),
            confidence: None,
            discard_reason: None,
            realized_net_percent: None,
        }
    }

    #[test]
    fn test_pstdev() {
        assert_eq!(pstdev(&[dec!(1)]), Decimal::ZERO);
        assert_eq!(pstdev(&[dec!(2), dec!(4), dec!(4), dec!(4), dec!(5), dec!(5), dec!(7), dec!(9)]).round_dp(6), dec!(2));
        assert_eq!(pstdev(&[dec!(1), dec!(2), dec!(3)]).round_dp(4), dec!(0.8165));
    }

    #[test]
    fn test_effective_net() {
        let costs = ExecutionCostsConfig {
            slippage_bps: dec!(10),
            rebalance_bps: dec!(5),
            latency_seconds: dec!(30),
            latency_penalty_multiplier: dec!(2),
        };
        assert_eq!(effective_net_percent(dec!(1), dec!(0.5), &costs), dec!(0.35));
        // no volatility, no latency penalty
        assert_eq!(effective_net_percent(dec!(1), Decimal::ZERO, &costs), dec!(0.85));
    }

    #[test]
    fn test_dynamic_threshold() {
        let a = analyzer(AnalysisConfig::default());
        let nets = [dec!(0.5), dec!(1.0), dec!(1.5), dec!(2.0), dec!(2.5)];

        // quantile index floor(0.4 * 5) = 2 -> 1.5; adjusted 0.8 - 0.4 * 0.4 = 0.64
        let thr = a.compute_dynamic_threshold(&nets, &nets, dec!(1), dec!(0.8));
        assert_eq!(thr, dec!(1.07));

        assert_eq!(a.compute_dynamic_threshold(&[], &[], dec!(1), dec!(0.8)), dec!(0.8));
    }

    #[test]
    fn test_dynamic_threshold_empty_input_is_clamped() {
        let a = analyzer(AnalysisConfig::default());
        assert_eq!(a.compute_dynamic_threshold(&[], &[], dec!(0), dec!(9)), dec!(5));
        assert_eq!(a.compute_dynamic_threshold(&[], &[], dec!(0), dec!(0.01)), dec!(0.1));
    }

    #[test]
    fn test_dynamic_threshold_adds_penalty_and_clamps() {
        let a = analyzer(AnalysisConfig::default());
        let nets = [dec!(9), dec!(10)];
        let effective = [dec!(8), dec!(9)];
        assert_eq!(
            a.compute_dynamic_threshold(&nets, &effective, dec!(0.6), dec!(0.8)),
            dec!(5)
        );

        let low = [dec!(-3), dec!(-2)];
        assert_eq!(
            a.compute_dynamic_threshold(&low, &low, dec!(0.6), dec!(0.1)),
            dec!(0.1)
        );
    }

    #[test]
    fn test_empty_history() {
        let a = analyzer(AnalysisConfig::default());
        let now = Utc::now();
        assert_eq!(a.analyze(&[], dec!(0.8), now), Err(AnalysisError::EmptyHistory));

        let mut discarded = row("BTC/USDT", dec!(1), now);
        discarded.discard_reason = Some(DiscardReason::Stale);
        assert_eq!(
            a.analyze(&[discarded], dec!(0.8), now),
            Err(AnalysisError::EmptyHistory)
        );
    }

    #[test]
    fn test_malformed_row() {
        let a = analyzer(AnalysisConfig::default());
        let now = Utc::now();
        let mut bad = row("BTC/USDT", dec!(1), now);
        bad.spread_net = None;

        let err = a.analyze(&[bad], dec!(0.8), now).unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedRow { .. }));
    }

    #[test]
    fn test_analyze_validates_recommendation() {
        let a = analyzer(AnalysisConfig::default());
        let now = Utc::now();
        let history: Vec<_> = [dec!(0.5), dec!(1.0), dec!(1.5), dec!(2.0), dec!(2.5)]
            .into_iter()
            .map(|net| row("BTC/USDT", net, now))
            .collect();

        let state = a.analyze(&history, dec!(0.8), now).unwrap();

        assert_eq!(state.rows_considered, 5);
        assert_eq!(state.success_rate, Decimal::ONE);
        assert_eq!(state.average_net_percent, dec!(1.5));
        assert_eq!(state.recommended_threshold, dec!(1.07));
        assert!(state.validated);
        assert_eq!(state.active_threshold, dec!(1.07));
        // rows at 1.5, 2.0 and 2.5 pass the recommendation
        assert_eq!(state.backtest.total_trades, 3);
        assert_eq!(state.backtest.cumulative_pnl, dec!(600));
        assert!(state.max_volatility > Decimal::ZERO);
        assert_eq!(state.computed_at, Some(now));
    }

    #[test]
    fn test_failed_backtest_keeps_base_threshold() {
        let a = analyzer(AnalysisConfig::default());
        let now = Utc::now();
        let history: Vec<_> = [dec!(1.0), dec!(1.2), dec!(1.4)]
            .into_iter()
            .map(|net| {
                let mut r = row("BTC/USDT", net, now);
                r.realized_net_percent = Some(dec!(-0.3));
                r
            })
            .collect();

        let state = a.analyze(&history, dec!(0.8), now).unwrap();

        assert_eq!(state.success_rate, Decimal::ZERO);
        assert!(!state.validated);
        assert_eq!(state.active_threshold, dec!(0.8));
        assert!(state.recommended_threshold >= dec!(0.1));
        assert!(state.recommended_threshold <= dec!(5));
    }

    #[test]
    fn test_lookback_window() {
        let settings = AnalysisConfig {
            lookback: Duration::from_secs(3600),
            ..AnalysisConfig::default()
        };
        let a = analyzer(settings);
        let now = Utc::now();
        let history = vec![
            row("BTC/USDT", dec!(1), now - TimeDelta::hours(2)),
            row("BTC/USDT", dec!(2), now - TimeDelta::minutes(10)),
        ];

        let state = a.analyze(&history, dec!(0.8), now).unwrap();
        assert_eq!(state.rows_considered, 1);
        assert_eq!(state.volatility_for("BTC/USDT"), Decimal::ZERO);
    }

    #[test]
    fn test_backtest_candidate() {
        let a = analyzer(AnalysisConfig::default());
        let now = Utc::now();
        let mut losing = row("ETH/USDT", dec!(1.5), now);
        losing.realized_net_percent = Some(dec!(-0.5));
        let history = vec![
            row("BTC/USDT", dec!(0.5), now),
            row("BTC/USDT", dec!(1.0), now),
            losing,
        ];

        let report = a.backtest(dec!(0.9), &history, now).unwrap();

        assert_eq!(report.threshold, dec!(0.9));
        assert_eq!(report.total_trades, 2);
        assert_eq!(report.profitable_trades, 1);
        assert_eq!(report.success_rate, dec!(0.5));
        assert_eq!(report.cumulative_pnl, dec!(50));
        assert_eq!(report.average_effective_percent, dec!(0.25));
    }
}
