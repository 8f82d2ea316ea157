//! Scanner error types.

use crate::analysis::AnalysisError;
use crate::config::ConfigError;
use crate::notification::NotificationError;
use crate::storage::StorageError;
use crate::venues::VenueError;

/// Scanner error type.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("scanner is already running")]
    AlreadyRunning,
    /// The configuration snapshot is structurally invalid; the tick is skipped.
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
    #[error("venue setup failed: {0}")]
    Venue(#[from] VenueError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("notification error: {0}")]
    Notification(#[from] NotificationError),
    #[error("analysis error: {0}")]
    Analysis(#[from] AnalysisError),
}
