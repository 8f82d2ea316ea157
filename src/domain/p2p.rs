//! Peer-to-peer offer book model.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Side of a P2P advert from the advertiser's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfferSide {
    /// Advertiser buys the asset: we can sell to them (bid side).
    Buy,
    /// Advertiser sells the asset: we can buy from them (ask side).
    Sell,
}

/// P2pOffer is one peer-listed offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct P2pOffer {
    #[serde(default)]
    pub advertiser: String,
    pub side: OfferSide,
    /// Price per asset unit in fiat.
    pub price: Decimal,
    /// Asset units available.
    #[serde(default)]
    pub available: Decimal,
    /// Minimum order amount in fiat.
    #[serde(default)]
    pub min_amount: Decimal,
    /// Maximum order amount in fiat, zero when unbounded.
    #[serde(default)]
    pub max_amount: Decimal,
    #[serde(default)]
    pub payment_methods: Vec<String>,
    /// Advertiser completion rate, 0..1.
    pub reputation: Option<Decimal>,
}
