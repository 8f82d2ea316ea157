//! Shared scan state and the settings mutation entry point.

use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::collector::VenueHealth;
use crate::config::{Config, ConfigError};
use crate::domain::{AnalysisState, Opportunity};

use super::ScanStats;

/// Everything a tick reads and folds its results into. Lives behind the
/// scanner's single RwLock.
pub(super) struct ScanState {
    pub config: Config,
    /// Bumped on every applied settings update.
    pub revision: u64,
    pub analysis: AnalysisState,
    pub stats: ScanStats,
    pub health: BTreeMap<String, VenueHealth>,
    /// Opportunities emitted by the last completed tick.
    pub recent: Vec<Opportunity>,
    /// Last tick failure, surfaced once until a tick succeeds.
    pub last_error: Option<String>,
}

impl ScanState {
    pub fn new(config: Config) -> Self {
        let analysis = AnalysisState::initial(config.thresholds.clamp(config.thresholds.base_percent));
        Self {
            config,
            revision: 0,
            analysis,
            stats: ScanStats::default(),
            health: BTreeMap::new(),
            recent: Vec::new(),
            last_error: None,
        }
    }

    /// Validates `update` against a copy of the config and swaps it in.
    /// Nothing changes when validation fails.
    pub fn apply(&mut self, update: &SettingsUpdate) -> Result<(), ConfigError> {
        let mut next = self.config.clone();
        if let Some(pairs) = &update.pairs {
            next.pairs = pairs.clone();
        }
        if let Some(base) = update.base_threshold {
            next.thresholds.base_percent = base;
        }
        if let Some(capital) = update.capital {
            next.capital.quote_amount = capital;
        }
        next.validate()?;

        // An unvalidated analysis follows the base threshold.
        if !self.analysis.validated {
            let base = next.thresholds.clamp(next.thresholds.base_percent);
            self.analysis.active_threshold = base;
            self.analysis.recommended_threshold = base;
        }
        self.config = next;
        self.revision += 1;
        Ok(())
    }

    pub fn snapshot(&self) -> ScanSnapshot {
        ScanSnapshot {
            revision: self.revision,
            pairs: self.config.pairs.clone(),
            base_threshold: self.config.thresholds.base_percent,
            capital: self.config.capital.quote_amount,
            analysis: self.analysis.clone(),
            stats: self.stats.clone(),
            health: self.health.clone(),
            recent: self.recent.clone(),
            last_error: self.last_error.clone(),
        }
    }
}

/// Runtime settings change requested by an outside collaborator (chat
/// command, web API). Unset fields stay as they are.
#[derive(Debug, Clone, Default)]
pub struct SettingsUpdate {
    pub pairs: Option<Vec<String>>,
    pub base_threshold: Option<Decimal>,
    pub capital: Option<Decimal>,
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        self.pairs.is_none() && self.base_threshold.is_none() && self.capital.is_none()
    }
}

/// Read-only copy of the scan state for dashboards and health reporting.
#[derive(Debug, Clone)]
pub struct ScanSnapshot {
    pub revision: u64,
    pub pairs: Vec<String>,
    pub base_threshold: Decimal,
    pub capital: Decimal,
    pub analysis: AnalysisState,
    pub stats: ScanStats,
    pub health: BTreeMap<String, VenueHealth>,
    pub recent: Vec<Opportunity>,
    pub last_error: Option<String>,
}
