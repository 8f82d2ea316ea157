//! Spot buy-here/sell-there routes.

use rust_decimal::Decimal;
use tracing::debug;

use super::transfer::{estimate_round_trip, transfer_percent};
use super::profit::simulate_spot;
use super::scoring::{self, liquidity_score};
use super::{OpportunityEngine, RouteError};
use crate::collector::QuoteSet;
use crate::domain::{
    Discard, DiscardReason, Opportunity, OpportunityKind, Pair, Quote, Route, TradeAction,
    decision_id,
};
use crate::venues::{is_p2p_adapter, root_venue};

fn kind_for(venues: &[&str]) -> OpportunityKind {
    if venues.iter().any(|v| is_p2p_adapter(v)) {
        OpportunityKind::P2p
    } else {
        OpportunityKind::Spot
    }
}

/// Evaluates every ordered (buy, sell) venue combination of a pair.
pub(super) fn evaluate_pair(
    engine: &OpportunityEngine<'_>,
    pair: &Pair,
    quotes: &QuoteSet,
    candidates: &mut Vec<Opportunity>,
    discards: &mut Vec<Discard>,
) {
    let mut stale: Vec<&Quote> = quotes.stale.iter().filter(|q| &q.pair == pair).collect();
    let mut fresh: Vec<&Quote> = Vec::new();
    if let Some(by_venue) = quotes.for_pair(pair) {
        for quote in by_venue.values() {
            if engine.is_fresh(quote) {
                fresh.push(quote);
            } else {
                stale.push(quote);
            }
        }
    }

    for quote in stale {
        let error = RouteError::Stale {
            venue: quote.venue.clone(),
            age_ms: quote.age(engine.now).as_millis() as u64,
        };
        debug!(pair = %pair, error = %error, "Stale quote discarded");
        discards.push(Discard {
            kind: kind_for(&[quote.venue.as_str()]),
            pair: pair.to_string(),
            route: format!("{}:{}", pair, quote.venue),
            venues: vec![quote.venue.clone()],
            reason: DiscardReason::Stale,
            gross_percent: None,
            net_percent: None,
            at: engine.now,
        });
    }

    if fresh.len() < 2 {
        let error = RouteError::InsufficientVenues { found: fresh.len() };
        debug!(pair = %pair, error = %error, "Pair skipped");
        discards.push(Discard {
            kind: OpportunityKind::Spot,
            pair: pair.to_string(),
            route: pair.to_string(),
            venues: fresh.iter().map(|q| q.venue.clone()).collect(),
            reason: error.reason(),
            gross_percent: None,
            net_percent: None,
            at: engine.now,
        });
        return;
    }

    for buy in &fresh {
        for sell in &fresh {
            if buy.venue == sell.venue {
                continue;
            }
            let kind = kind_for(&[buy.venue.as_str(), sell.venue.as_str()]);
            match evaluate_route(engine, pair, buy, sell, kind) {
                Ok(Some(opp)) => candidates.push(opp),
                Ok(None) => {}
                Err(e) => {
                    let route = spot_route(pair, buy, sell);
                    debug!(route = %route.key(), error = %e, "Route discarded");
                    discards.push(engine.reject(kind, &route, &e));
                }
            }
        }
    }
}

fn spot_route(pair: &Pair, buy: &Quote, sell: &Quote) -> Route {
    Route::Spot {
        pair: pair.clone(),
        buy_venue: buy.venue.clone(),
        sell_venue: sell.venue.clone(),
    }
}

fn out_of_range(quote: &Quote, stage: &'static str) -> RouteError {
    RouteError::OutOfRange {
        venue: quote.venue.clone(),
        stage,
    }
}

/// Buys at `buy`'s ask and sells at `sell`'s bid. Ok(None) when the net
/// spread misses the threshold.
fn evaluate_route(
    engine: &OpportunityEngine<'_>,
    pair: &Pair,
    buy: &Quote,
    sell: &Quote,
    kind: OpportunityKind,
) -> Result<Option<Opportunity>, RouteError> {
    let buy_fees = engine.fees_for(&buy.venue, pair);
    let sell_fees = engine.fees_for(&sell.venue, pair);

    let buy_price = buy_fees
        .execution_price(buy.ask_price, TradeAction::BuyBase)
        .ok_or_else(|| out_of_range(buy, "execution price"))?;
    let sell_price = sell_fees
        .execution_price(sell.bid_price, TradeAction::SellBase)
        .ok_or_else(|| out_of_range(sell, "execution price"))?;
    if buy_price <= Decimal::ZERO || sell_price <= Decimal::ZERO {
        return Ok(None);
    }

    let gross = (sell_price - buy_price)
        .checked_div(buy_price)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .ok_or_else(|| out_of_range(buy, "gross spread"))?;
    let fee = buy_fees.taker_percent + sell_fees.taker_percent;
    let mut net = gross - fee;
    if net < engine.threshold {
        return Ok(None);
    }

    let capital = engine.config.capital.for_pair(pair);
    if capital <= Decimal::ZERO {
        return Ok(None);
    }
    let base_qty = capital
        .checked_div(buy_price)
        .ok_or_else(|| out_of_range(buy, "base quantity"))?;

    engine
        .limits_for(&buy.venue, pair)
        .check(base_qty, buy_price)
        .map_err(|violation| RouteError::ConstraintViolation {
            venue: buy.venue.clone(),
            violation,
            gross,
            net,
        })?;
    engine
        .limits_for(&sell.venue, pair)
        .check(base_qty, sell_price)
        .map_err(|violation| RouteError::ConstraintViolation {
            venue: sell.venue.clone(),
            violation,
            gross,
            net,
        })?;

    let mut transfer = Decimal::ZERO;
    let transfers = &engine.config.transfers;
    if transfers.enabled && root_venue(&buy.venue) != root_venue(&sell.venue) {
        transfer = estimate_round_trip(
            pair,
            engine.venue_config(&buy.venue),
            engine.venue_config(&sell.venue),
            base_qty,
            sell_price,
        )
        .and_then(|estimate| {
            transfer_percent(&estimate, capital, transfers.eta_penalty_percent_per_hour)
        })
        .ok_or_else(|| out_of_range(sell, "transfer cost"))?;
        net -= transfer;
        if net < engine.threshold {
            return Err(RouteError::TransferCost {
                gross,
                net,
                transfer,
            });
        }
    }

    let sim = simulate_spot(
        capital,
        buy_price,
        sell_price,
        buy_fees.taker_percent,
        sell_fees.taker_percent,
        net,
    )
    .ok_or_else(|| out_of_range(sell, "simulated notional"))?;

    let route = spot_route(pair, buy, sell);
    let depth = buy.ask_size.min(sell.bid_size);
    let scores = scoring::score(
        net,
        engine.threshold,
        liquidity_score(depth, sim.base_qty),
        engine.volatility_score(&route.group()),
    );

    Ok(Some(Opportunity {
        id: decision_id(&route.key(), engine.now, "emit"),
        kind,
        route,
        leg_prices: vec![buy_price, sell_price],
        gross_percent: gross,
        fee_percent: fee,
        transfer_percent: transfer,
        net_percent: net,
        capital,
        simulated_pnl: sim.simulated_pnl,
        fees_quote: sim.fees_quote,
        base_qty: sim.base_qty,
        liquidity_score: scores.liquidity,
        volatility_score: scores.volatility,
        priority_score: scores.priority,
        confidence: scores.confidence,
        detected_at: engine.now,
        oldest_quote_at: buy.timestamp.min(sell.timestamp),
    }))
}
