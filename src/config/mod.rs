//! Configuration loading and validation for the scanner.
//!
//! Uses serde_yaml to load YAML configuration files; Telegram secrets come
//! from environment variables only.

mod alerts;
mod analysis;
mod app;
mod capital;
mod collector;
mod duration;
mod error;
mod notification;
mod p2p;
mod storage;
mod thresholds;
mod triangular;
mod venue;

pub use alerts::{AlertConfig, EngineConfig, TransferConfig};
pub use analysis::{AnalysisConfig, ExecutionCostsConfig};
pub use app::AppConfig;
pub use capital::CapitalConfig;
pub use collector::{CircuitBreakerConfig, CollectorConfig, RetryConfig, StaticQuote};
pub use error::ConfigError;
pub use notification::{NotificationConfig, TelegramConfig};
pub use p2p::P2pConfig;
pub use storage::StorageConfig;
pub use thresholds::ThresholdConfig;
pub use triangular::TriangularRouteConfig;
pub use venue::{VenueConfig, VenueKind, VenueP2pConfig};

use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::{env, fs};

use crate::domain::Pair;

/// Root configuration structure.
///
/// Required sections: app, pairs, venues.
/// Everything else falls back to defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Application-level settings like name and environment.
    pub app: AppConfig,
    /// Pairs to monitor (e.g., "BTC/USDT").
    pub pairs: Vec<String>,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    #[serde(default)]
    pub capital: CapitalConfig,
    /// Maps venue names to their configurations.
    pub venues: BTreeMap<String, VenueConfig>,
    #[serde(default)]
    pub collector: CollectorConfig,
    #[serde(default)]
    pub triangular_routes: Vec<TriangularRouteConfig>,
    #[serde(default)]
    pub p2p: P2pConfig,
    #[serde(default)]
    pub transfers: TransferConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub alerts: AlertConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    /// Alert channels like Telegram (optional).
    pub notification: Option<NotificationConfig>,
    /// Decision log persistence (optional).
    pub storage: Option<StorageConfig>,
}

impl Config {
    /// Load configuration from a YAML file at the given path.
    ///
    /// First loads environment variables from `.env` (if present), then the
    /// YAML file, then `TELEGRAM_BOT_TOKEN`, `TELEGRAM_CHAT_ID` and
    /// `TELEGRAM_ERROR_CHAT_ID`.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let content = fs::read_to_string(path)?;
        let mut config: Config = serde_yaml::from_str(&content)?;

        config.load_credentials_from_env();
        config.validate()?;

        Ok(config)
    }

    fn load_credentials_from_env(&mut self) {
        if let Some(telegram) = self
            .notification
            .as_mut()
            .and_then(|n| n.telegram.as_mut())
        {
            if telegram.enabled {
                telegram.bot_token = env::var("TELEGRAM_BOT_TOKEN").unwrap_or_default();
                telegram.chat_id = env::var("TELEGRAM_CHAT_ID").unwrap_or_default();
                telegram.error_chat_id = env::var("TELEGRAM_ERROR_CHAT_ID").unwrap_or_default();
            }
        }
    }

    /// Parses and de-duplicates the monitored pairs, keeping their order.
    pub fn monitored_pairs(&self) -> Result<Vec<Pair>, ConfigError> {
        let mut seen = BTreeSet::new();
        let mut pairs = Vec::with_capacity(self.pairs.len());
        for raw in &self.pairs {
            let pair = Pair::parse(raw)?;
            if seen.insert(pair.clone()) {
                pairs.push(pair);
            }
        }
        Ok(pairs)
    }

    /// Names of enabled venues, in lexical order.
    pub fn enabled_venues(&self) -> impl Iterator<Item = (&String, &VenueConfig)> {
        self.venues.iter().filter(|(_, v)| v.enabled)
    }

    /// Validate the configuration.
    ///
    /// Run at startup and again on every tick against the runtime snapshot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app.name.is_empty() {
            return Err(ConfigError::Validation("app.name is required".into()));
        }

        if self.pairs.is_empty() {
            return Err(ConfigError::Validation(
                "at least one trading pair is required".into(),
            ));
        }
        self.monitored_pairs()?;

        let t = &self.thresholds;
        if t.min_percent > t.max_percent
            || t.base_percent < t.min_percent
            || t.base_percent > t.max_percent
        {
            return Err(ConfigError::Validation(format!(
                "thresholds must satisfy min <= base <= max (got {} / {} / {})",
                t.min_percent, t.base_percent, t.max_percent
            )));
        }

        if self.capital.quote_amount <= Decimal::ZERO {
            return Err(ConfigError::Validation(
                "capital.quote_amount must be positive".into(),
            ));
        }
        let negative_weight = self
            .capital
            .pair_weights
            .values()
            .chain(self.capital.triangle_weights.values())
            .any(|w| *w < Decimal::ZERO);
        if negative_weight {
            return Err(ConfigError::Validation(
                "capital weights must not be negative".into(),
            ));
        }

        if self.collector.workers == 0 {
            return Err(ConfigError::Validation(
                "collector.workers must be positive".into(),
            ));
        }
        if self.collector.timeout.is_zero() {
            return Err(ConfigError::Validation(
                "collector.timeout must be positive".into(),
            ));
        }

        let mut enabled_venues = 0;
        for (name, venue) in self.enabled_venues() {
            enabled_venues += 1;

            let kind = venue.kind.or_else(|| VenueKind::from_name(name));
            match kind {
                None => {
                    return Err(ConfigError::Validation(format!(
                        "venue {}: kind is required for unknown venues",
                        name
                    )));
                }
                Some(VenueKind::Generic) if venue.endpoint.is_none() => {
                    return Err(ConfigError::Validation(format!(
                        "venue {}: generic adapter requires an endpoint",
                        name
                    )));
                }
                _ => {}
            }

            if venue.capabilities.p2p {
                let p2p = venue.p2p.as_ref().ok_or_else(|| {
                    ConfigError::Validation(format!(
                        "venue {}: p2p capability requires a p2p section",
                        name
                    ))
                })?;
                p2p.pair()?;
            }
        }

        if enabled_venues == 0 {
            return Err(ConfigError::Validation(
                "at least one venue must be enabled".into(),
            ));
        }

        for route in &self.triangular_routes {
            route.validate()?;
        }

        let target = self.analysis.target_success_rate;
        if target <= Decimal::ZERO || target > Decimal::ONE {
            return Err(ConfigError::Validation(
                "analysis.target_success_rate must be in (0, 1]".into(),
            ));
        }

        Ok(())
    }
}
