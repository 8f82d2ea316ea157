//! Venue trading constraints per pair.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a quantity cannot be traded under a venue's limits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LimitViolation {
    #[error("quantity rounds to zero at step {step}")]
    ZeroQuantity { step: Decimal },
    #[error("quantity {qty} below min_qty {min}")]
    MinQty { qty: Decimal, min: Decimal },
    #[error("notional {notional} below min_notional {min}")]
    MinNotional { notional: Decimal, min: Decimal },
}

/// PairLimits holds the min notional, min quantity and lot step of a pair.
/// Zero disables the respective check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PairLimits {
    pub min_notional: Decimal,
    pub min_qty: Decimal,
    pub step_size: Decimal,
}

impl PairLimits {
    /// Rounds `qty` down to a multiple of the step size.
    pub fn floor_to_step(&self, qty: Decimal) -> Decimal {
        if self.step_size <= Decimal::ZERO {
            return qty;
        }
        qty.checked_div(self.step_size)
            .map_or(qty, |steps| steps.floor() * self.step_size)
    }

    /// Returns the tradable quantity after step rounding, or the violated limit.
    pub fn check(&self, qty: Decimal, price: Decimal) -> Result<Decimal, LimitViolation> {
        let floored = self.floor_to_step(qty);
        if floored <= Decimal::ZERO {
            return Err(LimitViolation::ZeroQuantity {
                step: self.step_size,
            });
        }
        if floored < self.min_qty {
            return Err(LimitViolation::MinQty {
                qty: floored,
                min: self.min_qty,
            });
        }
        // a notional past Decimal range clears any minimum
        if let Some(notional) = floored.checked_mul(price) {
            if notional < self.min_notional {
                return Err(LimitViolation::MinNotional {
                    notional,
                    min: self.min_notional,
                });
            }
        }
        Ok(floored)
    }
}
