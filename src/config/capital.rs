//! Simulation capital configuration.

use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;

use crate::domain::Pair;

/// Capital the engine simulates trades with, in the quote asset.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CapitalConfig {
    pub quote_amount: Decimal,
    /// Multipliers per pair ("BTC/USDT"), with an optional "default" key.
    pub pair_weights: HashMap<String, Decimal>,
    /// Multipliers per triangle ("venue::name"), with an optional "default" key.
    pub triangle_weights: HashMap<String, Decimal>,
}

impl Default for CapitalConfig {
    fn default() -> Self {
        Self {
            quote_amount: Decimal::new(10_000, 0),
            pair_weights: HashMap::new(),
            triangle_weights: HashMap::new(),
        }
    }
}

impl CapitalConfig {
    pub fn for_pair(&self, pair: &Pair) -> Decimal {
        weighted(self.quote_amount, &self.pair_weights, &pair.to_string())
    }

    pub fn for_triangle(&self, route_key: &str) -> Decimal {
        weighted(self.quote_amount, &self.triangle_weights, route_key)
    }
}

fn weighted(base: Decimal, weights: &HashMap<String, Decimal>, key: &str) -> Decimal {
    if base <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let weight = weights
        .get(key)
        .or_else(|| weights.get("default"))
        .copied()
        .unwrap_or(Decimal::ONE);
    base * weight
}
