//! Top-of-book quote model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::Pair;

/// QuoteSource tells where a quote came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteSource {
    /// Live venue ticker endpoint.
    Ticker,
    /// Synthesized from a P2P offer book.
    P2p,
    /// Configured quote served by a static venue.
    Static,
    /// Static quote from configuration, used when every fetch attempt failed.
    Fallback,
}

impl std::fmt::Display for QuoteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuoteSource::Ticker => write!(f, "ticker"),
            QuoteSource::P2p => write!(f, "p2p"),
            QuoteSource::Static => write!(f, "static"),
            QuoteSource::Fallback => write!(f, "fallback"),
        }
    }
}

/// Quote is the best bid/ask of one pair on one venue at one instant.
///
/// Quotes are produced once per successful fetch and never updated; a stale
/// quote is dropped and replaced by the next fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Adapter name the quote was fetched from.
    pub venue: String,
    pub pair: Pair,
    /// Best bid (highest price a buyer pays).
    pub bid_price: Decimal,
    pub bid_size: Decimal,
    /// Best ask (lowest price a seller accepts).
    pub ask_price: Decimal,
    pub ask_size: Decimal,
    /// Observation time reported by the venue, or the receive time when absent.
    pub timestamp: DateTime<Utc>,
    pub source: QuoteSource,
}

impl Quote {
    /// Age of the quote at `now`. Timestamps ahead of `now` count as zero age.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.timestamp).to_std().unwrap_or(Duration::ZERO)
    }

    /// Returns true if the quote is no older than `max_age` at `now` and not
    /// dated more than `max_age` ahead of it.
    pub fn is_fresh(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        let ahead = (self.timestamp - now).to_std().unwrap_or(Duration::ZERO);
        self.age(now) <= max_age && ahead <= max_age
    }

    pub fn mid_price(&self) -> Decimal {
        (self.bid_price + self.ask_price) / Decimal::TWO
    }
}
