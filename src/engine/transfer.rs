//! Inter-venue transfer cost estimation.

use rust_decimal::Decimal;

use crate::config::VenueConfig;
use crate::domain::{Pair, TransferEstimate, transfer_loss};

/// Estimates moving the bought base asset from the buy venue to the sell
/// venue, and the quote proceeds back from the sell venue to the buy venue.
///
/// The base leg loss is valued at the sell price; minutes of both legs add up.
/// None when the valuation leaves `Decimal` range.
pub fn estimate_round_trip(
    pair: &Pair,
    buy_venue: Option<&VenueConfig>,
    sell_venue: Option<&VenueConfig>,
    base_qty: Decimal,
    sell_price: Decimal,
) -> Option<TransferEstimate> {
    if base_qty <= Decimal::ZERO || sell_price <= Decimal::ZERO {
        return Some(TransferEstimate::default());
    }

    let (base, quote) = (pair.base(), pair.quote());

    let (base_loss, base_minutes) = transfer_loss(
        base_qty,
        buy_venue.and_then(|v| v.transfer_profile(base)),
        sell_venue.and_then(|v| v.transfer_profile(base)),
    );

    let quote_amount = base_qty.checked_mul(sell_price)?;
    let (quote_loss, quote_minutes) = transfer_loss(
        quote_amount,
        sell_venue.and_then(|v| v.transfer_profile(quote)),
        buy_venue.and_then(|v| v.transfer_profile(quote)),
    );

    Some(TransferEstimate {
        cost_quote: base_loss.checked_mul(sell_price)?.checked_add(quote_loss)?,
        minutes: base_minutes + quote_minutes,
        base_loss,
        quote_loss,
    })
}

/// Converts an estimate into spread percent: the cost relative to capital,
/// plus `eta_penalty_per_hour` for every hour the funds are in flight.
pub fn transfer_percent(
    estimate: &TransferEstimate,
    capital: Decimal,
    eta_penalty_per_hour: Decimal,
) -> Option<Decimal> {
    if capital <= Decimal::ZERO {
        return Some(Decimal::ZERO);
    }
    let cost = estimate
        .cost_quote
        .checked_div(capital)?
        .checked_mul(Decimal::ONE_HUNDRED)?;
    let delay = estimate.minutes / Decimal::from(60) * eta_penalty_per_hour;
    cost.checked_add(delay)
}
