//! Venue adapters: one polymorphic quote capability per venue.

mod binance;
mod bybit;
mod generic;
pub(crate) mod http;
mod kucoin;
mod okx;
mod p2p;
mod registry;
mod static_quotes;
mod utils;

pub use binance::BinanceAdapter;
pub use bybit::BybitAdapter;
pub use generic::GenericAdapter;
pub use http::HttpClient;
pub use kucoin::KucoinAdapter;
pub use okx::OkxAdapter;
pub use p2p::P2pAdapter;
pub use registry::{AdapterRegistry, VenueError};
pub use static_quotes::StaticAdapter;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::domain::{Pair, Quote};

/// Failure category reported for a fetch, as shown in health and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchErrorKind {
    Timeout,
    Http,
    Parse,
    CircuitOpen,
}

impl std::fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchErrorKind::Timeout => write!(f, "timeout"),
            FetchErrorKind::Http => write!(f, "http-error"),
            FetchErrorKind::Parse => write!(f, "parse-error"),
            FetchErrorKind::CircuitOpen => write!(f, "circuit-open"),
        }
    }
}

/// Quote fetch errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// No response within the per-call timeout.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// Transport failure or non-2xx response. `status` is None when no
    /// response was received.
    #[error("http error{}: {message}", status_suffix(.status))]
    Http {
        status: Option<u16>,
        message: String,
    },

    /// Malformed or unusable payload.
    #[error("parse error: {0}")]
    Parse(String),

    /// Call short-circuited by the venue's circuit breaker.
    #[error("circuit open for {0}")]
    CircuitOpen(String),
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::Timeout(_) => FetchErrorKind::Timeout,
            FetchError::Http { .. } => FetchErrorKind::Http,
            FetchError::Parse(_) => FetchErrorKind::Parse,
            FetchError::CircuitOpen(_) => FetchErrorKind::CircuitOpen,
        }
    }

    /// Timeouts, connection failures, 5xx and 429 are worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Timeout(_) => true,
            FetchError::Http { status: None, .. } => true,
            FetchError::Http {
                status: Some(code), ..
            } => *code >= 500 || *code == 429,
            FetchError::Parse(_) | FetchError::CircuitOpen(_) => false,
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" {}", s)).unwrap_or_default()
}

/// Result type for venue operations.
pub type Result<T> = std::result::Result<T, FetchError>;

/// VenueAdapter normalizes one venue's price response into a canonical `Quote`.
#[async_trait]
pub trait VenueAdapter: Send + Sync {
    /// Name returns the unique identifier of this adapter (e.g., "binance",
    /// "binance:p2p"). Quotes carry it as their venue.
    fn name(&self) -> &str;

    /// Returns false for pairs the adapter never quotes; the collector skips them.
    fn supports(&self, _pair: &Pair) -> bool {
        true
    }

    /// Fetches the current best bid/ask for a pair with one outbound call.
    /// Malformed payloads map to `FetchError::Parse`, never a panic.
    async fn fetch_quote(&self, pair: &Pair) -> Result<Quote>;
}

/// Adapter name of a venue's P2P book.
pub fn p2p_adapter_name(venue: &str) -> String {
    format!("{}:p2p", venue)
}

pub fn is_p2p_adapter(adapter: &str) -> bool {
    adapter.ends_with(":p2p")
}

/// Venue an adapter name belongs to ("binance:p2p" -> "binance").
pub fn root_venue(adapter: &str) -> &str {
    adapter.split(':').next().unwrap_or(adapter)
}
