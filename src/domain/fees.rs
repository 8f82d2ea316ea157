//! Trading fee structures.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{Pair, TradeAction};

/// FeeSchedule is the effective fee set for one pair on one venue.
/// Percent values are expressed as percents (0.1 means 0.1%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Taker fee percent, charged on every leg in the engine.
    pub taker_percent: Decimal,
    pub maker_percent: Decimal,
    /// Expected execution slippage in basis points.
    pub slippage_bps: Decimal,
}

impl FeeSchedule {
    /// Price actually paid or received once slippage is applied. None when
    /// the adjusted price is out of `Decimal` range.
    pub fn execution_price(&self, price: Decimal, action: TradeAction) -> Option<Decimal> {
        apply_slippage(price, self.slippage_bps, action)
    }
}

/// Per-pair override of a venue's default fees. Unset fields inherit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeOverride {
    pub taker_percent: Option<Decimal>,
    pub maker_percent: Option<Decimal>,
    pub slippage_bps: Option<Decimal>,
    pub native_discount_percent: Option<Decimal>,
}

/// VenueFees is the tiered fee table of one venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VenueFees {
    pub taker_percent: Decimal,
    pub maker_percent: Decimal,
    pub slippage_bps: Decimal,
    /// Discount in percent points when fees are paid in the venue's token.
    pub native_discount_percent: Decimal,
    /// Active VIP tier, looked up in `vip_multipliers`.
    pub vip_level: String,
    pub vip_multipliers: HashMap<String, Decimal>,
    pub per_pair: HashMap<Pair, FeeOverride>,
}

impl Default for VenueFees {
    fn default() -> Self {
        Self {
            taker_percent: Decimal::new(10, 2),
            maker_percent: Decimal::ZERO,
            slippage_bps: Decimal::ZERO,
            native_discount_percent: Decimal::ZERO,
            vip_level: "default".to_string(),
            vip_multipliers: HashMap::new(),
            per_pair: HashMap::new(),
        }
    }
}

impl VenueFees {
    /// Flat fee table with a single taker fee for every pair.
    pub fn flat(taker_percent: Decimal) -> Self {
        Self {
            taker_percent,
            ..Self::default()
        }
    }

    fn vip_multiplier(&self) -> Decimal {
        self.vip_multipliers
            .get(&self.vip_level)
            .or_else(|| self.vip_multipliers.get("default"))
            .copied()
            .unwrap_or(Decimal::ONE)
    }

    /// Resolves the effective schedule for `pair`: per-pair override, then
    /// VIP multiplier, then native-token discount (never below zero).
    pub fn schedule_for_pair(&self, pair: &Pair) -> FeeSchedule {
        let over = self.per_pair.get(pair).cloned().unwrap_or_default();
        let multiplier = self.vip_multiplier();

        let mut taker = over.taker_percent.unwrap_or(self.taker_percent) * multiplier;
        let mut maker = over.maker_percent.unwrap_or(self.maker_percent) * multiplier;

        let discount = over
            .native_discount_percent
            .unwrap_or(self.native_discount_percent);
        if discount > Decimal::ZERO {
            taker = (taker - discount).max(Decimal::ZERO);
            maker = (maker - discount).max(Decimal::ZERO);
        }

        FeeSchedule {
            taker_percent: taker,
            maker_percent: maker,
            slippage_bps: over.slippage_bps.unwrap_or(self.slippage_bps),
        }
    }
}

/// Moves a price against the trader by `slippage_bps`: buys pay more,
/// sells receive less. Non-positive prices collapse to zero.
pub fn apply_slippage(price: Decimal, slippage_bps: Decimal, action: TradeAction) -> Option<Decimal> {
    if price <= Decimal::ZERO {
        return Some(Decimal::ZERO);
    }
    if slippage_bps <= Decimal::ZERO {
        return Some(price);
    }
    let factor = slippage_bps / Decimal::from(10_000);
    match action {
        TradeAction::BuyBase => price.checked_mul(Decimal::ONE + factor),
        TradeAction::SellBase => price
            .checked_mul(Decimal::ONE - factor)
            .map(|p| p.max(Decimal::ZERO)),
    }
}
