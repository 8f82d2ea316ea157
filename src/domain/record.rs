//! Decision log rows.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{Confidence, Opportunity, OpportunityKind};

/// Why a route was not emitted as an opportunity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiscardReason {
    /// A quote was older than the max quote age at decision time.
    #[serde(rename = "stale")]
    Stale,
    /// Fewer than two fresh venue quotes for a spot pair.
    #[serde(rename = "<2 venues")]
    InsufficientVenues,
    /// Traded quantity violates min notional, min qty or step size.
    #[serde(rename = "constraint_violation")]
    ConstraintViolation,
    /// Triangular legs observed too far apart in time.
    #[serde(rename = "inconsistent_legs")]
    InconsistentLegs,
    /// A triangular leg has no quote on the route's venue.
    #[serde(rename = "missing_quote")]
    MissingQuote,
    /// Net fell below threshold once transfer cost was applied.
    #[serde(rename = "transfer_fee/ETA")]
    TransferCost,
    /// A better route for the same pair won the tick.
    #[serde(rename = "superseded")]
    Superseded,
    /// Route arithmetic on the quoted prices overflowed.
    #[serde(rename = "out_of_range")]
    OutOfRange,
}

impl DiscardReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscardReason::Stale => "stale",
            DiscardReason::InsufficientVenues => "<2 venues",
            DiscardReason::ConstraintViolation => "constraint_violation",
            DiscardReason::InconsistentLegs => "inconsistent_legs",
            DiscardReason::MissingQuote => "missing_quote",
            DiscardReason::TransferCost => "transfer_fee/ETA",
            DiscardReason::Superseded => "superseded",
            DiscardReason::OutOfRange => "out_of_range",
        }
    }
}

impl std::fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DiscardReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stale" => Ok(DiscardReason::Stale),
            "<2 venues" => Ok(DiscardReason::InsufficientVenues),
            "constraint_violation" => Ok(DiscardReason::ConstraintViolation),
            "inconsistent_legs" => Ok(DiscardReason::InconsistentLegs),
            "missing_quote" => Ok(DiscardReason::MissingQuote),
            "transfer_fee/ETA" => Ok(DiscardReason::TransferCost),
            "superseded" => Ok(DiscardReason::Superseded),
            "out_of_range" => Ok(DiscardReason::OutOfRange),
            _ => Err(format!("Unknown discard reason: {}", s)),
        }
    }
}

/// OpportunityRecord is one decision row: an emitted opportunity, or a
/// discarded route with its reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpportunityRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: OpportunityKind,
    /// Pair label ("BTC/USDT") or triangle leg chain.
    pub pair: String,
    pub route: String,
    pub venues: Vec<String>,
    pub spread_gross: Option<Decimal>,
    pub spread_net: Option<Decimal>,
    pub simulated_pnl: Option<Decimal>,
    pub confidence: Option<Confidence>,
    pub discard_reason: Option<DiscardReason>,
    /// Net percent actually realized, filled in later by the operator.
    pub realized_net_percent: Option<Decimal>,
}

impl OpportunityRecord {
    /// Record for an emitted opportunity.
    pub fn emitted(opp: &Opportunity) -> Self {
        Self {
            id: opp.id.clone(),
            timestamp: opp.detected_at,
            kind: opp.kind,
            pair: opp.route.label(),
            route: opp.route.key(),
            venues: opp.route.venues(),
            spread_gross: Some(opp.gross_percent),
            spread_net: Some(opp.net_percent),
            simulated_pnl: Some(opp.simulated_pnl),
            confidence: Some(opp.confidence),
            discard_reason: None,
            realized_net_percent: None,
        }
    }

    /// Record for a discarded route; spreads are present when they were computed.
    pub fn discarded(discard: &Discard) -> Self {
        Self {
            id: decision_id(&discard.route, discard.at, discard.reason.as_str()),
            timestamp: discard.at,
            kind: discard.kind,
            pair: discard.pair.clone(),
            route: discard.route.clone(),
            venues: discard.venues.clone(),
            spread_gross: discard.gross_percent,
            spread_net: discard.net_percent,
            simulated_pnl: None,
            confidence: None,
            discard_reason: Some(discard.reason),
            realized_net_percent: None,
        }
    }

    pub fn is_emitted(&self) -> bool {
        self.discard_reason.is_none()
    }
}

/// Discard describes a route dropped during detection.
#[derive(Debug, Clone, PartialEq)]
pub struct Discard {
    pub kind: OpportunityKind,
    pub pair: String,
    pub route: String,
    pub venues: Vec<String>,
    pub reason: DiscardReason,
    pub gross_percent: Option<Decimal>,
    pub net_percent: Option<Decimal>,
    pub at: DateTime<Utc>,
}

/// Derives a stable 32-hex-char id from a route key, a decision time and a tag.
pub fn decision_id(route_key: &str, at: DateTime<Utc>, tag: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(route_key.as_bytes());
    hasher.update(at.timestamp_millis().to_be_bytes());
    hasher.update(tag.as_bytes());
    let hash = hasher.finalize();
    hex::encode(&hash[..16])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_discard_reason_text() {
        assert_eq!(DiscardReason::InsufficientVenues.to_string(), "<2 venues");
        assert_eq!(DiscardReason::TransferCost.to_string(), "transfer_fee/ETA");
        for reason in [
            DiscardReason::Stale,
            DiscardReason::InsufficientVenues,
            DiscardReason::ConstraintViolation,
            DiscardReason::InconsistentLegs,
            DiscardReason::MissingQuote,
            DiscardReason::TransferCost,
            DiscardReason::Superseded,
        ] {
            assert_eq!(reason.as_str().parse::<DiscardReason>().unwrap(), reason);
        }
    }

    #[test]
    fn test_decision_id_is_stable() {
        let at = Utc::now();
        let a = decision_id("BTC/USDT:a->b", at, "emit");
        let b = decision_id("BTC/USDT:a->b", at, "emit");
        let c = decision_id("BTC/USDT:b->a", at, "emit");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn test_discarded_record() {
        let d = Discard {
            kind: OpportunityKind::Spot,
            pair: "BTC/USDT".into(),
            route: "BTC/USDT".into(),
            venues: vec!["binance".into()],
            reason: DiscardReason::InsufficientVenues,
            gross_percent: None,
            net_percent: Some(dec!(0.5)),
            at: Utc::now(),
        };
        let rec = OpportunityRecord::discarded(&d);
        assert!(!rec.is_emitted());
        assert_eq!(rec.discard_reason, Some(DiscardReason::InsufficientVenues));
        assert_eq!(rec.spread_net, Some(dec!(0.5)));
        assert!(rec.confidence.is_none());
    }
}
