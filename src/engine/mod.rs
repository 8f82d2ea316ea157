//! Opportunity detection over one tick's quote set.
//!
//! Routes: spot buy-here/sell-there across venues (P2P books included as
//! ordinary quotes) and configured triangular cycles within one venue. Every
//! route either becomes an `Opportunity` or, when it was rejected for a
//! reason worth recording, a `Discard`. Routes that merely miss the
//! threshold produce neither.

mod error;
mod p2p;
mod profit;
mod scoring;
mod spot;
mod transfer;
mod triangular;

pub use error::RouteError;
pub use p2p::synthesize_quote as synthesize_p2p_quote;

use scoring::{rank, volatility_score};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::debug;

use crate::collector::QuoteSet;
use crate::config::{Config, VenueConfig};
use crate::domain::{
    AnalysisState, Discard, DiscardReason, FeeSchedule, Opportunity, OpportunityKind,
    OpportunityRecord, Pair, PairLimits, Quote, Route, VenueFees,
};
use crate::venues::{is_p2p_adapter, root_venue};

/// Output of one detection pass.
#[derive(Debug, Clone, Default)]
pub struct Detection {
    /// Emitted opportunities, best first.
    pub opportunities: Vec<Opportunity>,
    pub discards: Vec<Discard>,
}

impl Detection {
    /// Decision log rows: emitted first, then discards.
    pub fn records(&self) -> Vec<OpportunityRecord> {
        self.opportunities
            .iter()
            .map(OpportunityRecord::emitted)
            .chain(self.discards.iter().map(OpportunityRecord::discarded))
            .collect()
    }

    /// Number of discards with the given reason.
    pub fn discard_count(&self, reason: DiscardReason) -> usize {
        self.discards.iter().filter(|d| d.reason == reason).count()
    }
}

/// OpportunityEngine evaluates routes against one configuration snapshot,
/// active threshold and analysis state. It does no I/O.
pub struct OpportunityEngine<'a> {
    config: &'a Config,
    threshold: Decimal,
    analysis: &'a AnalysisState,
    now: DateTime<Utc>,
}

impl<'a> OpportunityEngine<'a> {
    /// The threshold is clamped to the configured bounds.
    pub fn new(
        config: &'a Config,
        threshold: Decimal,
        analysis: &'a AnalysisState,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            config,
            threshold: config.thresholds.clamp(threshold),
            analysis,
            now,
        }
    }

    pub fn threshold(&self) -> Decimal {
        self.threshold
    }

    /// Runs spot routes for every pair and every configured triangular route,
    /// then ranks the results and applies the per-pair route cap.
    pub fn detect(&self, pairs: &[Pair], quotes: &QuoteSet) -> Detection {
        let mut candidates = Vec::new();
        let mut discards = Vec::new();

        for pair in pairs {
            spot::evaluate_pair(self, pair, quotes, &mut candidates, &mut discards);
        }

        for route in &self.config.triangular_routes {
            let route_def = route.to_route();
            match triangular::evaluate(self, route, quotes) {
                Ok(Some(opp)) => candidates.push(opp),
                Ok(None) => {}
                Err(e) => {
                    debug!(route = %route_def.key(), error = %e, "Triangular route discarded");
                    discards.push(self.reject(OpportunityKind::Triangular, &route_def, &e));
                }
            }
        }

        let (opportunities, superseded) = rank(candidates, self.config.engine.max_routes_per_pair);
        for opp in superseded {
            discards.push(Discard {
                kind: opp.kind,
                pair: opp.route.label(),
                route: opp.route.key(),
                venues: opp.route.venues(),
                reason: DiscardReason::Superseded,
                gross_percent: Some(opp.gross_percent),
                net_percent: Some(opp.net_percent),
                at: self.now,
            });
        }

        Detection {
            opportunities,
            discards,
        }
    }

    fn venue_config(&self, adapter: &str) -> Option<&'a VenueConfig> {
        self.config.venues.get(root_venue(adapter))
    }

    /// Effective fee schedule of an adapter for a pair. P2P adapters use the
    /// venue's P2P fees when configured.
    fn fees_for(&self, adapter: &str, pair: &Pair) -> FeeSchedule {
        let Some(venue) = self.venue_config(adapter) else {
            return VenueFees::default().schedule_for_pair(pair);
        };
        let fees = if is_p2p_adapter(adapter) {
            venue
                .p2p
                .as_ref()
                .and_then(|p| p.fees.as_ref())
                .unwrap_or(&venue.fees)
        } else {
            &venue.fees
        };
        fees.schedule_for_pair(pair)
    }

    fn limits_for(&self, adapter: &str, pair: &Pair) -> PairLimits {
        self.venue_config(adapter)
            .map(|v| v.limits_for(pair))
            .unwrap_or_default()
    }

    fn is_fresh(&self, quote: &Quote) -> bool {
        quote.is_fresh(self.now, self.config.collector.max_quote_age)
    }

    fn volatility_score(&self, group: &str) -> Decimal {
        volatility_score(
            self.analysis.volatility_for(group),
            self.analysis.max_volatility,
        )
    }

    fn reject(&self, kind: OpportunityKind, route: &Route, error: &RouteError) -> Discard {
        let (gross_percent, net_percent) = error.spreads();
        Discard {
            kind,
            pair: route.label(),
            route: route.key(),
            venues: route.venues(),
            reason: error.reason(),
            gross_percent,
            net_percent,
            at: self.now,
        }
    }
}
