use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::{DiscardReason, LimitViolation, Pair};

/// Why a single route could not become an opportunity. Each variant maps to
/// a `DiscardReason` on the decision log; none of them abort a tick.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouteError {
    #[error("quote from {venue} is {age_ms}ms old")]
    Stale { venue: String, age_ms: u64 },

    #[error("{found} fresh venue quote(s), need 2")]
    InsufficientVenues { found: usize },

    #[error("{venue}: {violation}")]
    ConstraintViolation {
        venue: String,
        violation: LimitViolation,
        gross: Decimal,
        net: Decimal,
    },

    #[error("leg timestamps {spread_ms}ms apart")]
    InconsistentLegs { spread_ms: u64 },

    #[error("no {pair} quote on {venue}")]
    MissingQuote { pair: Pair, venue: String },

    #[error("net {net}% below threshold after {transfer}% transfer cost")]
    TransferCost {
        gross: Decimal,
        net: Decimal,
        transfer: Decimal,
    },

    #[error("{venue}: {stage} out of decimal range")]
    OutOfRange { venue: String, stage: &'static str },
}

impl RouteError {
    pub fn reason(&self) -> DiscardReason {
        match self {
            RouteError::Stale { .. } => DiscardReason::Stale,
            RouteError::InsufficientVenues { .. } => DiscardReason::InsufficientVenues,
            RouteError::ConstraintViolation { .. } => DiscardReason::ConstraintViolation,
            RouteError::InconsistentLegs { .. } => DiscardReason::InconsistentLegs,
            RouteError::MissingQuote { .. } => DiscardReason::MissingQuote,
            RouteError::TransferCost { .. } => DiscardReason::TransferCost,
            RouteError::OutOfRange { .. } => DiscardReason::OutOfRange,
        }
    }

    /// Gross and net spread, when they were computed before the rejection.
    pub fn spreads(&self) -> (Option<Decimal>, Option<Decimal>) {
        match self {
            RouteError::ConstraintViolation { gross, net, .. }
            | RouteError::TransferCost { gross, net, .. } => (Some(*gross), Some(*net)),
            _ => (None, None),
        }
    }
}
