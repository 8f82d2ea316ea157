use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::{Confidence, Opportunity, OpportunityKind};

/// Notification event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    /// An opportunity passed the alert gate.
    Opportunity,
    /// A tick failed or a venue circuit opened.
    Error,
    Startup,
    Shutdown,
    /// Periodic scan statistics.
    Overview,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::Opportunity => write!(f, "opportunity"),
            EventType::Error => write!(f, "error"),
            EventType::Startup => write!(f, "startup"),
            EventType::Shutdown => write!(f, "shutdown"),
            EventType::Overview => write!(f, "overview"),
        }
    }
}

/// Alert payload for one forwarded opportunity.
#[derive(Debug, Clone)]
pub struct OpportunityData {
    pub kind: OpportunityKind,
    /// Pair or leg chain.
    pub label: String,
    pub route: String,
    pub venues: Vec<String>,
    pub leg_prices: Vec<Decimal>,
    pub gross_percent: Decimal,
    pub fee_percent: Decimal,
    pub transfer_percent: Decimal,
    pub net_percent: Decimal,
    pub capital: Decimal,
    pub simulated_pnl: Decimal,
    pub confidence: Confidence,
    pub threshold: Decimal,
}

impl OpportunityData {
    pub fn new(opp: &Opportunity, threshold: Decimal) -> Self {
        Self {
            kind: opp.kind,
            label: opp.route.label(),
            route: opp.route.key(),
            venues: opp.route.venues(),
            leg_prices: opp.leg_prices.clone(),
            gross_percent: opp.gross_percent,
            fee_percent: opp.fee_percent,
            transfer_percent: opp.transfer_percent,
            net_percent: opp.net_percent,
            capital: opp.capital,
            simulated_pnl: opp.simulated_pnl,
            confidence: opp.confidence,
            threshold,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ErrorData {
    pub component: String,
    pub message: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StartupData {
    pub version: String,
    pub venues: Vec<String>,
    pub pairs: Vec<String>,
    pub triangles: usize,
    pub threshold: Decimal,
}

#[derive(Debug, Clone)]
pub struct ShutdownData {
    pub reason: String,
    pub uptime: Duration,
    pub graceful: bool,
}

#[derive(Debug, Clone)]
pub struct OverviewData {
    pub uptime: Duration,
    pub ticks: u64,
    pub failed_ticks: u64,
    pub opportunities_detected: u64,
    pub alerts_sent: u64,
    pub discards: u64,
    pub active_threshold: Decimal,
    pub success_rate: Decimal,
}

#[derive(Debug, Clone)]
pub enum EventData {
    Opportunity(OpportunityData),
    Error(ErrorData),
    Startup(StartupData),
    Shutdown(ShutdownData),
    Overview(OverviewData),
}

/// Notification event.
#[derive(Debug, Clone)]
pub struct Event {
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub data: EventData,
}

impl Event {
    pub fn new(event_type: EventType, data: EventData) -> Self {
        Self {
            event_type,
            timestamp: Utc::now(),
            data,
        }
    }

    pub fn opportunity(data: OpportunityData) -> Self {
        Self::new(EventType::Opportunity, EventData::Opportunity(data))
    }

    pub fn error(data: ErrorData) -> Self {
        Self::new(EventType::Error, EventData::Error(data))
    }

    pub fn startup(data: StartupData) -> Self {
        Self::new(EventType::Startup, EventData::Startup(data))
    }

    pub fn shutdown(data: ShutdownData) -> Self {
        Self::new(EventType::Shutdown, EventData::Shutdown(data))
    }

    pub fn overview(data: OverviewData) -> Self {
        Self::new(EventType::Overview, EventData::Overview(data))
    }
}

/// Notifier delivers events to an outside channel.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Sends and waits for delivery.
    async fn send(&self, event: &Event) -> Result<(), NotificationError>;

    /// Queues the event without waiting.
    fn send_async(&self, event: Event);

    fn is_enabled(&self, event_type: EventType) -> bool;

    async fn close(&self) -> Result<(), NotificationError>;
}

/// Notification error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NotificationError {
    #[error("invalid notifier config: {0}")]
    Config(String),
    #[error("HTTP request failed: {0}")]
    Http(String),
    #[error("Telegram API error: {status} - {body}")]
    Api { status: u16, body: String },
    #[error("{0}")]
    Combined(String),
}

/// MultiNotifier fans events out to several notifiers.
pub struct MultiNotifier {
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl MultiNotifier {
    pub fn new(notifiers: Vec<Arc<dyn Notifier>>) -> Self {
        Self { notifiers }
    }

    fn combine(errors: Vec<String>) -> Result<(), NotificationError> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(NotificationError::Combined(errors.join("; ")))
        }
    }
}

#[async_trait::async_trait]
impl Notifier for MultiNotifier {
    async fn send(&self, event: &Event) -> Result<(), NotificationError> {
        let mut errors = Vec::new();
        for notifier in &self.notifiers {
            if notifier.is_enabled(event.event_type) {
                if let Err(e) = notifier.send(event).await {
                    errors.push(e.to_string());
                }
            }
        }
        Self::combine(errors)
    }

    fn send_async(&self, event: Event) {
        for notifier in &self.notifiers {
            if notifier.is_enabled(event.event_type) {
                notifier.send_async(event.clone());
            }
        }
    }

    fn is_enabled(&self, event_type: EventType) -> bool {
        self.notifiers.iter().any(|n| n.is_enabled(event_type))
    }

    async fn close(&self) -> Result<(), NotificationError> {
        let mut errors = Vec::new();
        for notifier in &self.notifiers {
            if let Err(e) = notifier.close().await {
                errors.push(e.to_string());
            }
        }
        Self::combine(errors)
    }
}

/// NoopNotifier drops every event. Used when no channel is configured.
#[derive(Default)]
pub struct NoopNotifier;

impl NoopNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Notifier for NoopNotifier {
    async fn send(&self, _event: &Event) -> Result<(), NotificationError> {
        Ok(())
    }

    fn send_async(&self, _event: Event) {}

    fn is_enabled(&self, _event_type: EventType) -> bool {
        false
    }

    async fn close(&self) -> Result<(), NotificationError> {
        Ok(())
    }
}

// === Formatting ===

pub fn format_opportunity(data: &OpportunityData) -> String {
    let prices = data
        .leg_prices
        .iter()
        .map(|p| p.normalize().to_string())
        .collect::<Vec<_>>()
        .join(" → ");
    let transfer = if data.transfer_percent.is_zero() {
        String::new()
    } else {
        format!(" − transfer {:.3}%", data.transfer_percent)
    };

    format!(
        "🔔 *{} opportunity* ({} confidence)\n\n\
         💰 Net: *{:.3}%* (threshold {:.2}%)\n\
         Gross {:.3}% − fees {:.3}%{}\n\
         📈 Simulated PnL: *{:.2}* on {}\n\n\
         {} #{}\n\
         Route: {}\n\
         Venues: {}\n\
         Prices: {}\n\n\
         ⏰ {}",
        kind_title(data.kind),
        data.confidence,
        data.net_percent,
        data.threshold,
        data.gross_percent,
        data.fee_percent,
        transfer,
        data.simulated_pnl,
        data.capital.normalize(),
        data.label,
        format_pair_tag(&data.label),
        data.route,
        data.venues.join(", "),
        prices,
        Utc::now().format("%H:%M:%S UTC")
    )
}

fn kind_title(kind: OpportunityKind) -> &'static str {
    match kind {
        OpportunityKind::Spot => "Spot",
        OpportunityKind::P2p => "P2P",
        OpportunityKind::Triangular => "Triangular",
    }
}

pub fn format_error(data: &ErrorData) -> String {
    let error_str = data
        .error
        .as_ref()
        .map(|e| format!("\nError: {}", e))
        .unwrap_or_default();

    format!(
        "⚠️ *Error*\n\n\
         Component: {}\n\
         Message: {}{}\n\n\
         ⏰ {}",
        data.component,
        data.message,
        error_str,
        Utc::now().format("%H:%M:%S UTC")
    )
}

pub fn format_startup(data: &StartupData) -> String {
    format!(
        "🤖 *Scanner started*\n\n\
         Version: {}\n\
         Venues: {}\n\
         Pairs: {}\n\
         Triangles: {}\n\
         Threshold: {:.2}%\n\n\
         ⏰ {}",
        data.version,
        data.venues.join(", "),
        data.pairs.join(", "),
        data.triangles,
        data.threshold,
        Utc::now().format("%H:%M:%S UTC")
    )
}

pub fn format_shutdown(data: &ShutdownData) -> String {
    let status = if data.graceful {
        "✅ Graceful"
    } else {
        "⚠️ Forced"
    };

    format!(
        "🛑 *Scanner stopped*\n\n\
         Reason: {}\n\
         Status: {}\n\
         Uptime: {}\n\n\
         ⏰ {}",
        data.reason,
        status,
        format_duration(data.uptime),
        Utc::now().format("%H:%M:%S UTC")
    )
}

pub fn format_overview(data: &OverviewData) -> String {
    format!(
        "📊 *Scan overview*\n\n\
         ⏱ Uptime: {}\n\
         🔄 Ticks: {} ({} failed)\n\n\
         📈 Opportunities: {}\n\
         🔔 Alerts sent: {}\n\
         🗑 Discarded routes: {}\n\n\
         🎯 Active threshold: *{:.2}%*\n\
         ✅ Historical success: {:.0}%\n\n\
         ⏰ {}",
        format_duration(data.uptime),
        add_thousand_separators(data.ticks),
        data.failed_ticks,
        add_thousand_separators(data.opportunities_detected),
        data.alerts_sent,
        add_thousand_separators(data.discards),
        data.active_threshold,
        data.success_rate * Decimal::ONE_HUNDRED,
        Utc::now().format("%H:%M:%S UTC")
    )
}

pub fn format_event(event: &Event) -> String {
    match &event.data {
        EventData::Opportunity(data) => format_opportunity(data),
        EventData::Error(data) => format_error(data),
        EventData::Startup(data) => format_startup(data),
        EventData::Shutdown(data) => format_shutdown(data),
        EventData::Overview(data) => format_overview(data),
    }
}

// === Helpers ===

/// Hashtag form of a pair or leg chain ("BTC/USDT" -> "BTC\_USDT").
/// Underscores are escaped for Telegram Markdown.
fn format_pair_tag(label: &str) -> String {
    label
        .split(" > ")
        .next()
        .unwrap_or(label)
        .replace('/', "\\_")
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs < 86400 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
    }
}

fn add_thousand_separators(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
