//! Arbitrage opportunity domain model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Pair;

/// TradeAction is the direction of one leg relative to the pair's base asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeAction {
    /// Spend quote asset at the ask to receive base asset.
    BuyBase,
    /// Sell base asset at the bid to receive quote asset.
    SellBase,
}

/// OpportunityKind indicates the route topology of an opportunity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityKind {
    /// Buy on one venue, sell on another.
    Spot,
    /// Spot route where at least one side is a synthesized P2P book.
    P2p,
    /// Three-leg cycle on a single venue.
    Triangular,
}

impl std::fmt::Display for OpportunityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OpportunityKind::Spot => write!(f, "spot"),
            OpportunityKind::P2p => write!(f, "p2p"),
            OpportunityKind::Triangular => write!(f, "triangular"),
        }
    }
}

impl std::str::FromStr for OpportunityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spot" => Ok(OpportunityKind::Spot),
            "p2p" => Ok(OpportunityKind::P2p),
            "triangular" => Ok(OpportunityKind::Triangular),
            _ => Err(format!("Unknown opportunity kind: {}", s)),
        }
    }
}

/// Confidence label assigned by the scoring bands. Ordered low < medium < high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Confidence::Low => write!(f, "low"),
            Confidence::Medium => write!(f, "medium"),
            Confidence::High => write!(f, "high"),
        }
    }
}

impl std::str::FromStr for Confidence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Confidence::Low),
            "medium" => Ok(Confidence::Medium),
            "high" => Ok(Confidence::High),
            _ => Err(format!("Unknown confidence: {}", s)),
        }
    }
}

/// One leg of a triangular cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriangleLeg {
    pub pair: Pair,
    pub action: TradeAction,
}

/// Route is the path an opportunity trades along. Derived per tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Route {
    Spot {
        pair: Pair,
        buy_venue: String,
        sell_venue: String,
    },
    Triangular {
        venue: String,
        name: String,
        start_asset: String,
        legs: Vec<TriangleLeg>,
    },
}

impl Route {
    /// Stable identity used for de-duplication, tie-breaks and the decision log.
    pub fn key(&self) -> String {
        match self {
            Route::Spot {
                pair,
                buy_venue,
                sell_venue,
            } => format!("{}:{}->{}", pair, buy_venue, sell_venue),
            Route::Triangular { venue, name, .. } => format!("{}::{}", venue, name),
        }
    }

    /// Venues touched by the route, buy side first.
    pub fn venues(&self) -> Vec<String> {
        match self {
            Route::Spot {
                buy_venue,
                sell_venue,
                ..
            } => vec![buy_venue.clone(), sell_venue.clone()],
            Route::Triangular { venue, .. } => vec![venue.clone()],
        }
    }

    /// Human label: the pair for spot routes, the leg chain for triangles.
    pub fn label(&self) -> String {
        match self {
            Route::Spot { pair, .. } => pair.to_string(),
            Route::Triangular { legs, .. } => legs
                .iter()
                .map(|l| l.pair.to_string())
                .collect::<Vec<_>>()
                .join(" > "),
        }
    }

    /// Grouping key for the per-pair route cap: the pair for spot routes,
    /// the venue-qualified name for triangles.
    pub fn group(&self) -> String {
        match self {
            Route::Spot { pair, .. } => pair.to_string(),
            Route::Triangular { .. } => self.key(),
        }
    }
}

/// Opportunity represents a detected arbitrage opportunity.
/// Immutable once computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    /// Unique identifier, also the decision log id.
    pub id: String,
    pub kind: OpportunityKind,
    pub route: Route,
    /// Execution price per leg after slippage, in route order.
    pub leg_prices: Vec<Decimal>,
    /// Spread before fees, in percent.
    pub gross_percent: Decimal,
    /// Sum of taker fees over every leg, in percent.
    pub fee_percent: Decimal,
    /// Transfer cost and confirmation-delay penalty, in percent.
    pub transfer_percent: Decimal,
    /// gross - fees - transfer.
    pub net_percent: Decimal,
    /// Capital the simulation trades, after pair or triangle weights.
    pub capital: Decimal,
    /// capital * net / 100, in the quote asset.
    pub simulated_pnl: Decimal,
    /// Fees charged on both legs' notional, in the quote asset.
    pub fees_quote: Decimal,
    /// Base quantity bought on the first leg.
    pub base_qty: Decimal,
    /// 0..1, top-of-book depth relative to the traded quantity.
    pub liquidity_score: Decimal,
    /// 0..1, pair volatility relative to the most volatile pair.
    pub volatility_score: Decimal,
    pub priority_score: Decimal,
    pub confidence: Confidence,
    pub detected_at: DateTime<Utc>,
    /// Timestamp of the oldest quote the opportunity was built from.
    pub oldest_quote_at: DateTime<Utc>,
}

impl Opportunity {
    /// Returns true if the simulated trade makes money.
    pub fn is_profitable(&self) -> bool {
        self.simulated_pnl > Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_key_and_label() {
        let spot = Route::Spot {
            pair: Pair::parse("BTC/USDT").unwrap(),
            buy_venue: "binance".into(),
            sell_venue: "okx".into(),
        };
        assert_eq!(spot.key(), "BTC/USDT:binance->okx");
        assert_eq!(spot.label(), "BTC/USDT");
        assert_eq!(spot.group(), "BTC/USDT");
        assert_eq!(spot.venues(), vec!["binance", "okx"]);

        let tri = Route::Triangular {
            venue: "binance".into(),
            name: "usdt-btc-eth".into(),
            start_asset: "USDT".into(),
            legs: vec![
                TriangleLeg {
                    pair: Pair::parse("BTC/USDT").unwrap(),
                    action: TradeAction::BuyBase,
                },
                TriangleLeg {
                    pair: Pair::parse("ETH/BTC").unwrap(),
                    action: TradeAction::BuyBase,
                },
                TriangleLeg {
                    pair: Pair::parse("ETH/USDT").unwrap(),
                    action: TradeAction::SellBase,
                },
            ],
        };
        assert_eq!(tri.key(), "binance::usdt-btc-eth");
        assert_eq!(tri.label(), "BTC/USDT > ETH/BTC > ETH/USDT");
        assert_eq!(tri.venues(), vec!["binance"]);
    }

    #[test]
    fn test_confidence_ordering_and_parse() {
        assert!(Confidence::High > Confidence::Medium);
        assert!(Confidence::Medium > Confidence::Low);
        assert_eq!("high".parse::<Confidence>().unwrap(), Confidence::High);
        assert!("media".parse::<Confidence>().is_err());
        assert_eq!(
            "triangular".parse::<OpportunityKind>().unwrap(),
            OpportunityKind::Triangular
        );
    }

    #[test]
    fn test_trade_action_yaml() {
        let a: TradeAction = serde_yaml::from_str("BUY_BASE").unwrap();
        assert_eq!(a, TradeAction::BuyBase);
        let b: TradeAction = serde_yaml::from_str("SELL_BASE").unwrap();
        assert_eq!(b, TradeAction::SellBase);
    }
}
