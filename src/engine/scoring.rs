//! Liquidity/volatility weighting, confidence bands and route ranking.
//!
//! Constants:
//! - priority = 0.5 * spread + 0.3 * liquidity + 0.2 * (1 - volatility), where
//!   spread = net / (2 * threshold) capped at 1
//! - high: priority >= 0.75, liquidity >= 0.7, volatility <= 0.3 and
//!   net >= 1.25 * threshold
//! - low: liquidity < 0.3, volatility >= 0.7 or net below threshold
//! - medium otherwise

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::domain::{Confidence, Opportunity};

const SPREAD_WEIGHT: Decimal = dec!(0.5);
const LIQUIDITY_WEIGHT: Decimal = dec!(0.3);
const STABILITY_WEIGHT: Decimal = dec!(0.2);

const HIGH_PRIORITY: Decimal = dec!(0.75);
const HIGH_LIQUIDITY: Decimal = dec!(0.7);
const HIGH_MAX_VOLATILITY: Decimal = dec!(0.3);
const HIGH_THRESHOLD_MULTIPLE: Decimal = dec!(1.25);
const LOW_LIQUIDITY: Decimal = dec!(0.3);
const LOW_VOLATILITY: Decimal = dec!(0.7);

/// Scores of one opportunity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scores {
    pub liquidity: Decimal,
    pub volatility: Decimal,
    pub priority: Decimal,
    pub confidence: Confidence,
}

fn unit(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO).min(Decimal::ONE)
}

/// Top-of-book depth relative to the quantity the route needs, 0..1.
pub fn liquidity_score(available: Decimal, required: Decimal) -> Decimal {
    if required <= Decimal::ZERO || available <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    // overflow means depth dwarfs the requirement
    available.checked_div(required).map_or(Decimal::ONE, unit)
}

/// Pair volatility relative to the most volatile pair in history, 0..1.
pub fn volatility_score(pair_volatility: Decimal, max_volatility: Decimal) -> Decimal {
    if max_volatility <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    unit(pair_volatility / max_volatility)
}

pub fn priority_score(net: Decimal, threshold: Decimal, liquidity: Decimal, volatility: Decimal) -> Decimal {
    let spread = if threshold > Decimal::ZERO {
        net.checked_div(threshold * Decimal::TWO)
            .map_or(if net > Decimal::ZERO { Decimal::ONE } else { Decimal::ZERO }, unit)
    } else if net > Decimal::ZERO {
        Decimal::ONE
    } else {
        Decimal::ZERO
    };
    SPREAD_WEIGHT * spread
        + LIQUIDITY_WEIGHT * unit(liquidity)
        + STABILITY_WEIGHT * (Decimal::ONE - unit(volatility))
}

pub fn classify(
    net: Decimal,
    threshold: Decimal,
    liquidity: Decimal,
    volatility: Decimal,
    priority: Decimal,
) -> Confidence {
    if priority >= HIGH_PRIORITY
        && liquidity >= HIGH_LIQUIDITY
        && volatility <= HIGH_MAX_VOLATILITY
        && net >= threshold * HIGH_THRESHOLD_MULTIPLE
    {
        Confidence::High
    } else if liquidity < LOW_LIQUIDITY || volatility >= LOW_VOLATILITY || net < threshold {
        Confidence::Low
    } else {
        Confidence::Medium
    }
}

pub fn score(net: Decimal, threshold: Decimal, liquidity: Decimal, volatility: Decimal) -> Scores {
    let priority = priority_score(net, threshold, liquidity, volatility);
    Scores {
        liquidity,
        volatility,
        priority,
        confidence: classify(net, threshold, liquidity, volatility, priority),
    }
}

/// Highest net first; on equal net the higher confidence, then the lower
/// route key.
pub fn compare(a: &Opportunity, b: &Opportunity) -> Ordering {
    b.net_percent
        .cmp(&a.net_percent)
        .then_with(|| b.confidence.cmp(&a.confidence))
        .then_with(|| a.route.key().cmp(&b.route.key()))
}

/// Sorts opportunities and keeps at most `max_per_group` per route group
/// (pair for spot routes). Returns (kept, superseded), both sorted.
pub fn rank(
    mut opportunities: Vec<Opportunity>,
    max_per_group: usize,
) -> (Vec<Opportunity>, Vec<Opportunity>) {
    opportunities.sort_by(compare);

    let limit = max_per_group.max(1);
    let mut taken: HashMap<String, usize> = HashMap::new();
    let mut kept = Vec::new();
    let mut superseded = Vec::new();

    for opp in opportunities {
        let count = taken.entry(opp.route.group()).or_insert(0);
        if *count < limit {
            *count += 1;
            kept.push(opp);
        } else {
            superseded.push(opp);
        }
    }

    (kept, superseded)
}
