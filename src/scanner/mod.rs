//! Scan coordinator.
//!
//! Drives one tick at a time: collect quotes, recompute the analysis state,
//! detect opportunities against the active threshold, gate alerts, notify and
//! append every decision to the log. The configuration and analysis state
//! live behind one lock; a tick works on a snapshot taken at its start.

mod config;
mod error;
mod state;
mod stats;

pub use config::ScannerConfig;
pub use error::ScanError;
pub use state::{ScanSnapshot, SettingsUpdate};
pub use stats::{ScanStats, TickReport};

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, Notify, RwLock};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::alert::AlertGate;
use crate::analysis::{AnalysisError, HistoricalAnalyzer};
use crate::collector::{QuoteCollector, failure_counts};
use crate::config::Config;
use crate::domain::{AnalysisState, BacktestReport, Pair};
use crate::engine::OpportunityEngine;
use crate::notification::{
    ErrorData, Event, Notifier, OpportunityData, OverviewData, ShutdownData, StartupData,
    build_notifier,
};
use crate::storage::{OpportunityLog, open_log};
use crate::venues::AdapterRegistry;
use state::ScanState;

const DEFAULT_OVERVIEW_INTERVAL: Duration = Duration::from_secs(3600);

/// Scanner coordinates the collector, engine, analyzer and alert gate.
pub struct Scanner {
    state: RwLock<ScanState>,
    collector: QuoteCollector,
    registry: AdapterRegistry,
    gate: AlertGate,
    log: Arc<dyn OpportunityLog>,
    notifier: Arc<dyn Notifier>,

    version: String,
    started_at: Mutex<Option<Instant>>,
    running: Mutex<bool>,
    shutdown: Notify,
}

impl Scanner {
    /// Builds adapters, the decision log and the notifier from the config.
    pub async fn new(cfg: ScannerConfig) -> Result<Self, ScanError> {
        cfg.app_config.validate()?;
        let registry = AdapterRegistry::from_config(&cfg.app_config).await?;
        let log = open_log(cfg.app_config.storage.as_ref()).await?;
        let notifier = build_notifier(cfg.app_config.notification.as_ref())?;

        Ok(Self::with_parts(cfg, registry, log, notifier))
    }

    /// Assembles a scanner from already-built parts.
    pub fn with_parts(
        cfg: ScannerConfig,
        registry: AdapterRegistry,
        log: Arc<dyn OpportunityLog>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            gate: AlertGate::new(&cfg.app_config.alerts),
            state: RwLock::new(ScanState::new(cfg.app_config)),
            collector: QuoteCollector::new(),
            registry,
            log,
            notifier,
            version: cfg.version,
            started_at: Mutex::new(None),
            running: Mutex::new(false),
            shutdown: Notify::new(),
        }
    }

    /// Runs the scan loop until `stop` is called, then sends the shutdown
    /// event and closes the notifier and the decision log.
    pub async fn start(&self) -> Result<(), ScanError> {
        {
            let mut running = self.running.lock().await;
            if *running {
                return Err(ScanError::AlreadyRunning);
            }
            *running = true;
        }
        *self.started_at.lock().await = Some(Instant::now());

        let (startup, scan_interval, overview_interval) = {
            let state = self.state.read().await;
            let cfg = &state.config;
            let startup = StartupData {
                version: self.version.clone(),
                venues: self.registry.list().await,
                pairs: cfg.pairs.clone(),
                triangles: cfg.triangular_routes.len(),
                threshold: state.analysis.active_threshold,
            };
            (startup, cfg.collector.scan_interval, overview_interval(cfg))
        };

        info!(
            version = %startup.version,
            venues = ?startup.venues,
            pairs = ?startup.pairs,
            triangles = startup.triangles,
            "Starting scanner"
        );
        self.notifier.send_async(Event::startup(startup));

        self.run_loop(scan_interval, overview_interval).await;
        self.close().await;
        Ok(())
    }

    /// Asks the scan loop to exit after the current tick.
    pub async fn stop(&self) {
        let mut running = self.running.lock().await;
        if *running {
            info!("Stopping scanner...");
            *running = false;
            self.shutdown.notify_one();
        }
    }

    pub async fn is_running(&self) -> bool {
        *self.running.lock().await
    }

    pub async fn uptime(&self) -> Duration {
        self.started_at
            .lock()
            .await
            .map(|s| s.elapsed())
            .unwrap_or(Duration::ZERO)
    }

    /// Read-only copy of the shared state.
    pub async fn snapshot(&self) -> ScanSnapshot {
        self.state.read().await.snapshot()
    }

    /// The single entry point for runtime settings changes. The update is
    /// validated against the current config and applied atomically; the
    /// next tick picks it up.
    pub async fn apply_settings(&self, update: SettingsUpdate) -> Result<u64, ScanError> {
        let mut state = self.state.write().await;
        if update.is_empty() {
            return Ok(state.revision);
        }
        state.apply(&update)?;
        info!(
            revision = state.revision,
            pairs = ?update.pairs,
            base_threshold = ?update.base_threshold,
            capital = ?update.capital,
            "Settings updated"
        );
        Ok(state.revision)
    }

    /// Stores the net percent realized for a logged opportunity; later
    /// analysis passes prefer it over the modeled cost.
    pub async fn record_outcome(
        &self,
        id: &str,
        realized_net_percent: Decimal,
    ) -> Result<(), ScanError> {
        self.log.record_outcome(id, realized_net_percent).await?;
        Ok(())
    }

    /// Replays the decision log inside the analysis window against a
    /// candidate threshold. Read-only; the active threshold is untouched.
    pub async fn backtest(&self, candidate: Decimal) -> Result<BacktestReport, ScanError> {
        let config = self.state.read().await.config.clone();
        let analyzer = HistoricalAnalyzer::new(&config);
        let now = Utc::now();
        let history = self.log.history(analyzer.window_start(now)).await?;
        let report = analyzer.backtest(candidate, &history, now)?;
        debug!(
            candidate = %candidate,
            trades = report.total_trades,
            success_rate = %report.success_rate,
            "Backtest finished"
        );
        Ok(report)
    }

    async fn run_loop(&self, scan_interval: Duration, overview_interval: Duration) {
        let mut ticker = tokio::time::interval(scan_interval.max(Duration::from_millis(100)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut overview_timer = tokio::time::interval(overview_interval);
        // skip the immediate first tick
        overview_timer.tick().await;

        info!(
            scan_interval = ?scan_interval,
            overview_interval = ?overview_interval,
            "Starting scan loop"
        );

        loop {
            tokio::select! {
                _ = self.shutdown.notified() => break,
                _ = ticker.tick() => {
                    if !self.is_running().await {
                        break;
                    }
                    // Errors are recorded in the shared state by run_tick.
                    let _ = self.run_tick().await;
                }
                _ = overview_timer.tick() => {
                    if !self.is_running().await {
                        break;
                    }
                    self.send_overview().await;
                }
            }
        }
    }

    /// Sends the shutdown event, then closes the notifier and the decision log.
    pub async fn close(&self) {
        let uptime = self.uptime().await;

        if let Err(e) = self
            .notifier
            .send(&Event::shutdown(ShutdownData {
                reason: "graceful shutdown".to_string(),
                uptime,
                graceful: true,
            }))
            .await
        {
            debug!(error = %e, "Failed to send shutdown notification");
        }
        if let Err(e) = self.notifier.close().await {
            warn!(error = %e, "Failed to close notifier");
        }
        if let Err(e) = self.log.close().await {
            warn!(error = %e, "Failed to close decision log");
        }

        info!(uptime = ?uptime, "Scanner stopped");
    }

    /// Runs one tick to completion.
    ///
    /// Only an invalid configuration snapshot fails the tick. Fetch errors,
    /// analysis failures and log write errors degrade it instead.
    pub async fn run_tick(&self) -> Result<TickReport, ScanError> {
        let started = Instant::now();
        let (config, revision, previous) = {
            let state = self.state.read().await;
            (state.config.clone(), state.revision, state.analysis.clone())
        };

        let (pairs, fetch_pairs) = match tick_pairs(&config) {
            Ok(pairs) => pairs,
            Err(e) => {
                self.record_failure(&e).await;
                return Err(e);
            }
        };

        debug!(pairs = pairs.len(), fetch_pairs = fetch_pairs.len(), "Tick started");

        let adapters = self.registry.adapters().await;
        let quotes = self
            .collector
            .collect(&adapters, &fetch_pairs, &config.collector)
            .await;
        let now = quotes.collected_at;

        for (kind, count) in failure_counts(&quotes.failures) {
            debug!(kind = %kind, failures = count, "Fetch failures this tick");
        }

        let (analysis, analysis_updated) = self.recompute_analysis(&config, previous, now).await;
        let threshold = analysis.active_threshold;

        let detection =
            OpportunityEngine::new(&config, threshold, &analysis, now).detect(&pairs, &quotes);

        let alerts = self.gate.filter(&detection.opportunities, now);
        for opp in &alerts {
            info!(
                route = %opp.route.key(),
                net_percent = %opp.net_percent,
                confidence = %opp.confidence,
                "Opportunity alert forwarded"
            );
            self.notifier
                .send_async(Event::opportunity(OpportunityData::new(opp, threshold)));
        }
        let suppressed = detection.opportunities.len() - alerts.len();
        if suppressed > 0 {
            debug!(suppressed, "Alerts suppressed by cooldown");
        }

        let logged = match self.log.append(&detection.records()).await {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "Failed to append decision records");
                0
            }
        };

        let report = TickReport {
            quotes: quotes.quote_count(),
            stale: quotes.stale.len(),
            failures: quotes.failures.len(),
            opportunities: detection.opportunities.len(),
            alerts: alerts.len(),
            discards: detection.discards.len(),
            logged,
            threshold,
            analysis_updated,
            duration: started.elapsed(),
        };

        {
            let mut state = self.state.write().await;
            // A settings change during the tick wins over this tick's analysis.
            if state.revision == revision {
                state.analysis = analysis;
            }
            state.stats.record_tick(&report, now);
            state.health = quotes.health;
            state.recent = detection.opportunities;
            state.last_error = None;
        }

        info!(
            quotes = report.quotes,
            stale = report.stale,
            failures = report.failures,
            opportunities = report.opportunities,
            alerts = report.alerts,
            discards = report.discards,
            threshold = %report.threshold,
            duration_ms = report.duration.as_millis() as u64,
            "Tick completed"
        );

        Ok(report)
    }

    /// Recomputes the analysis state from the log, keeping `previous` when
    /// the history cannot be loaded or analyzed.
    async fn recompute_analysis(
        &self,
        config: &Config,
        previous: AnalysisState,
        now: DateTime<Utc>,
    ) -> (AnalysisState, bool) {
        let analyzer = HistoricalAnalyzer::new(config);
        let history = match self.log.history(analyzer.window_start(now)).await {
            Ok(history) => history,
            Err(e) => {
                warn!(error = %e, "Failed to load decision history, keeping previous analysis");
                return (previous, false);
            }
        };

        match analyzer.analyze(&history, config.thresholds.base_percent, now) {
            Ok(state) => {
                if state.active_threshold != previous.active_threshold {
                    info!(
                        rows = state.rows_considered,
                        success_rate = %state.success_rate,
                        recommended = %state.recommended_threshold,
                        active = %state.active_threshold,
                        validated = state.validated,
                        "Analysis threshold updated"
                    );
                }
                (state, true)
            }
            Err(AnalysisError::EmptyHistory) => {
                debug!("No decision history yet");
                (previous, false)
            }
            Err(e) => {
                warn!(error = %e, "Analysis failed, keeping previous state");
                (previous, false)
            }
        }
    }

    /// Counts a failed tick and surfaces the error once until a tick
    /// succeeds again.
    async fn record_failure(&self, error: &ScanError) {
        let message = error.to_string();
        let mut state = self.state.write().await;
        state.stats.record_failed_tick(Utc::now());

        if state.last_error.as_deref() == Some(message.as_str()) {
            debug!(error = %message, "Tick skipped");
            return;
        }
        warn!(error = %message, "Tick failed");
        state.last_error = Some(message.clone());
        self.notifier.send_async(Event::error(ErrorData {
            component: "scanner".to_string(),
            message: "tick skipped".to_string(),
            error: Some(message),
        }));
    }

    async fn send_overview(&self) {
        let uptime = self.uptime().await;
        let data = {
            let state = self.state.read().await;
            OverviewData {
                uptime,
                ticks: state.stats.ticks,
                failed_ticks: state.stats.failed_ticks,
                opportunities_detected: state.stats.opportunities_detected,
                alerts_sent: state.stats.alerts_sent,
                discards: state.stats.discards,
                active_threshold: state.analysis.active_threshold,
                success_rate: state.analysis.success_rate,
            }
        };
        self.notifier.send_async(Event::overview(data));
    }
}

/// Pairs for spot detection, and those plus every triangle leg pair for
/// collection. Both keep config order without duplicates.
fn tick_pairs(config: &Config) -> Result<(Vec<Pair>, Vec<Pair>), ScanError> {
    config.validate()?;
    let pairs = config.monitored_pairs()?;

    let mut seen: BTreeSet<Pair> = pairs.iter().cloned().collect();
    let mut fetch_pairs = pairs.clone();
    for leg in config.triangular_routes.iter().flat_map(|r| &r.legs) {
        if seen.insert(leg.pair.clone()) {
            fetch_pairs.push(leg.pair.clone());
        }
    }
    Ok((pairs, fetch_pairs))
}

fn overview_interval(config: &Config) -> Duration {
    config
        .notification
        .as_ref()
        .and_then(|n| n.telegram.as_ref())
        .map(|t| t.overview_interval)
        .filter(|d| !d.is_zero())
        .unwrap_or(DEFAULT_OVERVIEW_INTERVAL)
}

#[cfg(test)]
mod tests;
