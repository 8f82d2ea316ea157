//! Three-leg cycles within one venue.

use rust_decimal::Decimal;

use super::profit::simulate_cycle;
use super::scoring::{self, liquidity_score};
use super::{OpportunityEngine, RouteError};
use crate::collector::QuoteSet;
use crate::config::TriangularRouteConfig;
use crate::domain::{Opportunity, OpportunityKind, Quote, TradeAction, decision_id};

fn out_of_range(venue: &str, stage: &'static str) -> RouteError {
    RouteError::OutOfRange {
        venue: venue.to_string(),
        stage,
    }
}

/// Walks the cycle starting with the route's capital in the start asset.
///
/// Every leg must have a fresh quote on the route's venue and all leg
/// timestamps must lie within one max-age window of each other. The net is
/// the compounded gross minus the sum of leg taker fees. Leg quantities are
/// checked against the venue's trading limits.
pub(super) fn evaluate(
    engine: &OpportunityEngine<'_>,
    config: &TriangularRouteConfig,
    quotes: &QuoteSet,
) -> Result<Option<Opportunity>, RouteError> {
    let route = config.to_route();
    let venue = config.venue.as_str();
    let max_age = engine.config.collector.max_quote_age;

    let mut leg_quotes: Vec<&Quote> = Vec::with_capacity(config.legs.len());
    for leg in &config.legs {
        let quote = match quotes.get(&leg.pair, venue) {
            Some(q) => q,
            None => {
                let stale = quotes
                    .stale
                    .iter()
                    .find(|q| q.pair == leg.pair && q.venue == venue);
                return Err(match stale {
                    Some(q) => RouteError::Stale {
                        venue: venue.to_string(),
                        age_ms: q.age(engine.now).as_millis() as u64,
                    },
                    None => RouteError::MissingQuote {
                        pair: leg.pair.clone(),
                        venue: venue.to_string(),
                    },
                });
            }
        };
        if !engine.is_fresh(quote) {
            return Err(RouteError::Stale {
                venue: venue.to_string(),
                age_ms: quote.age(engine.now).as_millis() as u64,
            });
        }
        leg_quotes.push(quote);
    }

    let oldest = leg_quotes.iter().map(|q| q.timestamp).min();
    let newest = leg_quotes.iter().map(|q| q.timestamp).max();
    let (Some(oldest), Some(newest)) = (oldest, newest) else {
        return Ok(None);
    };
    let spread = (newest - oldest).to_std().unwrap_or_default();
    if spread > max_age {
        return Err(RouteError::InconsistentLegs {
            spread_ms: spread.as_millis() as u64,
        });
    }

    let capital = engine.config.capital.for_triangle(&route.key());
    if capital <= Decimal::ZERO {
        return Ok(None);
    }

    // Amount held before each leg, in the asset that leg spends.
    let mut held = capital;
    let mut leg_prices = Vec::with_capacity(leg_quotes.len());
    let mut leg_fees = Vec::with_capacity(leg_quotes.len());
    let mut leg_checks = Vec::with_capacity(leg_quotes.len());
    let mut liquidity = Decimal::ONE;
    let mut first_leg_qty = Decimal::ZERO;

    for (i, (leg, quote)) in config.legs.iter().zip(&leg_quotes).enumerate() {
        let fees = engine.fees_for(venue, &leg.pair);
        let (raw, available) = match leg.action {
            TradeAction::BuyBase => (quote.ask_price, quote.ask_size),
            TradeAction::SellBase => (quote.bid_price, quote.bid_size),
        };
        let price = fees
            .execution_price(raw, leg.action)
            .ok_or_else(|| out_of_range(venue, "execution price"))?;
        if price <= Decimal::ZERO {
            return Ok(None);
        }

        // amount held after the leg
        let next = match leg.action {
            TradeAction::BuyBase => held.checked_div(price),
            TradeAction::SellBase => held.checked_mul(price),
        }
        .ok_or_else(|| out_of_range(venue, "leg amount"))?;
        let base_qty = match leg.action {
            TradeAction::BuyBase => next,
            TradeAction::SellBase => held,
        };
        leg_checks.push((leg.pair.clone(), base_qty, price));
        leg_fees.push(fees.taker_percent);
        leg_prices.push(price);
        liquidity = liquidity.min(liquidity_score(available, base_qty));
        if i == 0 {
            first_leg_qty = base_qty;
        }

        held = next;
    }

    let gross = held
        .checked_div(capital)
        .and_then(|ratio| (ratio - Decimal::ONE).checked_mul(Decimal::ONE_HUNDRED))
        .ok_or_else(|| out_of_range(venue, "gross spread"))?;
    let fee: Decimal = leg_fees.iter().copied().sum();
    let net = gross - fee;
    if net < engine.threshold {
        return Ok(None);
    }

    for (pair, qty, price) in &leg_checks {
        engine
            .limits_for(venue, pair)
            .check(*qty, *price)
            .map_err(|violation| RouteError::ConstraintViolation {
                venue: venue.to_string(),
                violation,
                gross,
                net,
            })?;
    }

    let sim = simulate_cycle(capital, &leg_fees, first_leg_qty, net)
        .ok_or_else(|| out_of_range(venue, "simulated notional"))?;
    let scores = scoring::score(
        net,
        engine.threshold,
        liquidity,
        engine.volatility_score(&route.label()),
    );

    Ok(Some(Opportunity {
        id: decision_id(&route.key(), engine.now, "emit"),
        kind: OpportunityKind::Triangular,
        route,
        leg_prices,
        gross_percent: gross,
        fee_percent: fee,
        transfer_percent: Decimal::ZERO,
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
        oldest_quote_at: oldest,
    }))
}
