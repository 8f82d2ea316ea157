//! Inter-venue transfer cost model.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// TransferProfile describes withdraw/deposit costs of one asset on one venue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferProfile {
    /// Fixed withdraw fee in asset units.
    pub withdraw_fee: Decimal,
    pub withdraw_percent: Decimal,
    pub withdraw_minutes: Decimal,
    /// Fixed deposit fee in asset units.
    pub deposit_fee: Decimal,
    pub deposit_percent: Decimal,
    pub deposit_minutes: Decimal,
}

/// Loss in asset units and minutes for moving `amount` out of one venue
/// (withdraw side) into another (deposit side).
pub fn transfer_loss(
    amount: Decimal,
    withdraw: Option<&TransferProfile>,
    deposit: Option<&TransferProfile>,
) -> (Decimal, Decimal) {
    if amount <= Decimal::ZERO {
        return (Decimal::ZERO, Decimal::ZERO);
    }
    let hundred = Decimal::ONE_HUNDRED;
    let mut units = Decimal::ZERO;
    let mut minutes = Decimal::ZERO;
    if let Some(w) = withdraw {
        units += w.withdraw_fee + w.withdraw_percent / hundred * amount;
        minutes += w.withdraw_minutes;
    }
    if let Some(d) = deposit {
        units += d.deposit_fee + d.deposit_percent / hundred * amount;
        minutes += d.deposit_minutes;
    }
    (units, minutes)
}

/// TransferEstimate is the round-trip cost of a cross-venue route.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransferEstimate {
    /// Total cost valued in the quote asset.
    pub cost_quote: Decimal,
    /// Total expected confirmation delay.
    pub minutes: Decimal,
    pub base_loss: Decimal,
    pub quote_loss: Decimal,
}

impl TransferEstimate {
    pub fn is_zero(&self) -> bool {
        self.cost_quote.is_zero() && self.minutes.is_zero()
    }
}
