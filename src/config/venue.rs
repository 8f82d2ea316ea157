//! Venue configuration.

use serde::Deserialize;
use std::collections::HashMap;

use super::StaticQuote;
use crate::domain::{Pair, PairLimits, TransferProfile, VenueFees};

/// Adapter implementation used for a venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VenueKind {
    Binance,
    Bybit,
    Kucoin,
    Okx,
    /// Endpoint template returning the canonical quote JSON.
    Generic,
    /// Quotes served from `static_quotes`, no network.
    Static,
}

impl VenueKind {
    /// Infers the adapter from a venue name when `kind` is omitted.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "binance" => Some(VenueKind::Binance),
            "bybit" => Some(VenueKind::Bybit),
            "kucoin" => Some(VenueKind::Kucoin),
            "okx" => Some(VenueKind::Okx),
            _ => None,
        }
    }
}

/// Settings for a single venue.
#[derive(Debug, Clone, Deserialize)]
pub struct VenueConfig {
    /// Whether this venue should be scanned.
    #[serde(default)]
    pub enabled: bool,
    /// Adapter variant (defaults from the venue name).
    pub kind: Option<VenueKind>,
    /// Base URL or, for `generic`, the endpoint template with
    /// `{symbol}`, `{base}`, `{quote}` placeholders.
    pub endpoint: Option<String>,
    #[serde(default)]
    pub capabilities: Capabilities,
    #[serde(default)]
    pub fees: VenueFees,
    /// Trading constraints per pair.
    #[serde(default)]
    pub limits: HashMap<Pair, PairLimits>,
    /// Withdraw/deposit profiles per asset.
    #[serde(default)]
    pub transfers: HashMap<String, TransferProfile>,
    /// P2P offer book endpoint, required when `capabilities.p2p` is set.
    pub p2p: Option<VenueP2pConfig>,
    /// Quotes served by the `static` adapter.
    #[serde(default)]
    pub static_quotes: HashMap<Pair, StaticQuote>,
}

impl VenueConfig {
    pub fn limits_for(&self, pair: &Pair) -> PairLimits {
        self.limits.get(pair).copied().unwrap_or_default()
    }

    pub fn transfer_profile(&self, asset: &str) -> Option<&TransferProfile> {
        self.transfers
            .get(asset)
            .or_else(|| self.transfers.get(&asset.to_ascii_uppercase()))
    }
}

/// Venue capability set.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    pub spot: bool,
    pub p2p: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            spot: true,
            p2p: false,
        }
    }
}

/// P2P offer book settings of a venue.
#[derive(Debug, Clone, Deserialize)]
pub struct VenueP2pConfig {
    /// Offer list URL; `{asset}` and `{fiat}` are substituted.
    pub endpoint: String,
    pub asset: String,
    pub fiat: String,
    /// Fees charged on P2P trades; defaults to the venue's spot fees.
    pub fees: Option<VenueFees>,
}

impl VenueP2pConfig {
    /// Pair the synthesized book is quoted in (asset/fiat).
    pub fn pair(&self) -> Result<Pair, crate::domain::PairError> {
        Pair::new(&self.asset, &self.fiat)
    }
}
