//! Runtime statistics for the scanner.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::time::Duration;

/// Counters accumulated across ticks.
#[derive(Debug, Clone, Default)]
pub struct ScanStats {
    pub ticks: u64,
    /// Ticks skipped because the configuration snapshot was invalid.
    pub failed_ticks: u64,
    pub opportunities_detected: u64,
    pub alerts_sent: u64,
    pub discards: u64,
    pub records_logged: u64,
    pub quotes_collected: u64,
    pub stale_quotes: u64,
    pub fetch_failures: u64,
    pub last_tick_at: Option<DateTime<Utc>>,
    pub last_tick_duration: Duration,
}

/// Summary of one completed tick.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub quotes: usize,
    pub stale: usize,
    pub failures: usize,
    pub opportunities: usize,
    pub alerts: usize,
    pub discards: usize,
    pub logged: usize,
    pub threshold: Decimal,
    /// False when the analyzer failed and the previous state was kept.
    pub analysis_updated: bool,
    pub duration: Duration,
}

impl ScanStats {
    pub(super) fn record_tick(&mut self, report: &TickReport, at: DateTime<Utc>) {
        self.ticks += 1;
        self.opportunities_detected += report.opportunities as u64;
        self.alerts_sent += report.alerts as u64;
        self.discards += report.discards as u64;
        self.records_logged += report.logged as u64;
        self.quotes_collected += report.quotes as u64;
        self.stale_quotes += report.stale as u64;
        self.fetch_failures += report.failures as u64;
        self.last_tick_at = Some(at);
        self.last_tick_duration = report.duration;
    }

    pub(super) fn record_failed_tick(&mut self, at: DateTime<Utc>) {
        self.ticks += 1;
        self.failed_ticks += 1;
        self.last_tick_at = Some(at);
    }
}
