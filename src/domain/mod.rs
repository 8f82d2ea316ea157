//! Domain models for quotes, routes and arbitrage opportunities.

mod analysis;
mod fees;
mod limits;
mod opportunity;
mod p2p;
mod pair;
mod quote;
mod record;
mod transfer;

pub use analysis::{AnalysisState, BacktestReport};
pub use fees::{FeeSchedule, VenueFees};
pub use limits::{LimitViolation, PairLimits};
pub use opportunity::{Confidence, Opportunity, OpportunityKind, Route, TradeAction, TriangleLeg};
pub use p2p::{OfferSide, P2pOffer};
pub use pair::{Pair, PairError};
pub use quote::{Quote, QuoteSource};
pub use record::{Discard, DiscardReason, OpportunityRecord, decision_id};
pub use transfer::{TransferEstimate, TransferProfile, transfer_loss};
