//! Profit simulation for configured capital.

use rust_decimal::Decimal;

/// Simulated outcome of trading a route once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Simulation {
    pub base_qty: Decimal,
    pub simulated_pnl: Decimal,
    pub fees_quote: Decimal,
}

/// Simulates a buy-then-sell with `capital` quote units.
///
/// Fees are charged on both traded legs: the buy notional at the buy fee and
/// the sell notional at the sell fee. PnL is `capital * net / 100`, where
/// `net_percent` already has both fees and any transfer cost subtracted.
/// None when an amount leaves `Decimal` range.
pub fn simulate_spot(
    capital: Decimal,
    buy_price: Decimal,
    sell_price: Decimal,
    buy_fee_percent: Decimal,
    sell_fee_percent: Decimal,
    net_percent: Decimal,
) -> Option<Simulation> {
    if capital <= Decimal::ZERO || buy_price <= Decimal::ZERO || sell_price <= Decimal::ZERO {
        return Some(Simulation {
            base_qty: Decimal::ZERO,
            simulated_pnl: Decimal::ZERO,
            fees_quote: Decimal::ZERO,
        });
    }

    let base_qty = capital.checked_div(buy_price)?;
    let buy_notional = base_qty.checked_mul(buy_price)?;
    let sell_notional = base_qty.checked_mul(sell_price)?;
    let fees_quote = percent_of(buy_notional, buy_fee_percent)?
        .checked_add(percent_of(sell_notional, sell_fee_percent)?)?;

    Some(Simulation {
        base_qty,
        simulated_pnl: percent_of(capital, net_percent)?,
        fees_quote,
    })
}

/// Simulates a triangular cycle. Each leg trades roughly the starting
/// capital, so each is charged its fee on `capital`.
pub fn simulate_cycle(
    capital: Decimal,
    leg_fee_percents: &[Decimal],
    first_leg_qty: Decimal,
    net_percent: Decimal,
) -> Option<Simulation> {
    let mut fees_quote = Decimal::ZERO;
    for fee in leg_fee_percents {
        fees_quote = fees_quote.checked_add(percent_of(capital, *fee)?)?;
    }

    Some(Simulation {
        base_qty: first_leg_qty,
        simulated_pnl: percent_of(capital, net_percent)?,
        fees_quote,
    })
}

fn percent_of(amount: Decimal, percent: Decimal) -> Option<Decimal> {
    amount.checked_mul(percent)?.checked_div(Decimal::ONE_HUNDRED)
}
