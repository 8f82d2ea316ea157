//! Trading pair identifier.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Pair parsing error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid pair {0:?}: expected BASE/QUOTE")]
pub struct PairError(pub String);

/// Pair is a base/quote asset pair, always held as uppercase `BASE/QUOTE`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pair {
    base: String,
    quote: String,
}

impl Pair {
    /// Creates a pair from two asset symbols.
    pub fn new(base: &str, quote: &str) -> Result<Self, PairError> {
        let base = normalize_asset(base).ok_or_else(|| PairError(format!("{}/{}", base, quote)))?;
        let quote =
            normalize_asset(quote).ok_or_else(|| PairError(format!("{}/{}", base, quote)))?;
        if base == quote {
            return Err(PairError(format!("{}/{}", base, quote)));
        }
        Ok(Self { base, quote })
    }

    /// Parses "btc/usdt", "BTC-USDT" or "BTC_USDT" into `BTC/USDT`.
    pub fn parse(s: &str) -> Result<Self, PairError> {
        let (base, quote) = s
            .trim()
            .split_once(['/', '-', '_'])
            .ok_or_else(|| PairError(s.to_string()))?;
        Self::new(base, quote).map_err(|_| PairError(s.to_string()))
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn quote(&self) -> &str {
        &self.quote
    }

    /// Joins both assets with a venue-specific separator ("" gives "BTCUSDT").
    pub fn symbol(&self, separator: &str) -> String {
        format!("{}{}{}", self.base, separator, self.quote)
    }
}

fn normalize_asset(asset: &str) -> Option<String> {
    let asset = asset.trim();
    if asset.is_empty() || !asset.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(asset.to_ascii_uppercase())
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

impl FromStr for Pair {
    type Err = PairError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Pair {
    type Error = PairError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Pair> for String {
    fn from(pair: Pair) -> Self {
        pair.to_string()
    }
}
