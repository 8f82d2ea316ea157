//! P2P offer filtering configuration.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Filters applied to P2P offers before a book is synthesized.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct P2pConfig {
    /// Accepted payment methods; empty accepts any.
    pub allowed_payment_methods: Vec<String>,
    /// Fiat amount we intend to trade; offers whose [min, max] excludes it are skipped.
    pub min_trade_amount: Decimal,
    /// Minimum advertiser reputation, 0..1.
    pub min_reputation: Option<Decimal>,
}
