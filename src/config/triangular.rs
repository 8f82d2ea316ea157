//! Triangular route configuration.

use serde::Deserialize;

use super::ConfigError;
use crate::domain::{Route, TradeAction, TriangleLeg};

/// A seeded three-leg cycle on one venue.
#[derive(Debug, Clone, Deserialize)]
pub struct TriangularRouteConfig {
    pub name: String,
    pub venue: String,
    /// Asset the cycle starts and ends in (default: USDT).
    #[serde(default = "default_start_asset")]
    pub start_asset: String,
    pub legs: Vec<TriangleLeg>,
}

fn default_start_asset() -> String {
    "USDT".to_string()
}

impl TriangularRouteConfig {
    /// Checks the route has three legs and that each leg spends the asset the
    /// previous one produced, ending back in the start asset.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |reason: String| ConfigError::Route {
            name: self.name.clone(),
            reason,
        };

        if self.venue.trim().is_empty() {
            return Err(fail("venue is required".into()));
        }
        if self.legs.len() != 3 {
            return Err(fail(format!("expected 3 legs, got {}", self.legs.len())));
        }

        let start = self.start_asset.to_ascii_uppercase();
        let mut held = start.clone();
        for (i, leg) in self.legs.iter().enumerate() {
            let (spends, receives) = match leg.action {
                TradeAction::BuyBase => (leg.pair.quote(), leg.pair.base()),
                TradeAction::SellBase => (leg.pair.base(), leg.pair.quote()),
            };
            if spends != held {
                return Err(fail(format!(
                    "leg {} ({}) spends {} but {} is held",
                    i + 1,
                    leg.pair,
                    spends,
                    held
                )));
            }
            held = receives.to_string();
        }
        if held != start {
            return Err(fail(format!("cycle ends in {} instead of {}", held, start)));
        }
        Ok(())
    }

    pub fn to_route(&self) -> Route {
        Route::Triangular {
            venue: self.venue.clone(),
            name: self.name.clone(),
            start_asset: self.start_asset.to_ascii_uppercase(),
            legs: self.legs.clone(),
        }
    }
}
