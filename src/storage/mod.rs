//! Append-only decision log: one row per emitted or discarded route.

mod memory;
mod sqlite;

pub use memory::MemoryLog;
pub use sqlite::{SqliteLog, SqliteLogConfig};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;

use crate::config::StorageConfig;
use crate::domain::OpportunityRecord;

/// OpportunityLog persists decision records. Rows are never rewritten except
/// for the realized outcome the operator reports later.
#[async_trait]
pub trait OpportunityLog: Send + Sync {
    /// Appends records; rows whose id is already logged are skipped.
    /// Returns the number of rows written.
    async fn append(&self, records: &[OpportunityRecord]) -> Result<usize, StorageError>;

    /// All rows at or after `since` (everything when None), oldest first.
    async fn history(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<OpportunityRecord>, StorageError>;

    /// Stores the net percent actually realized for an emitted opportunity.
    async fn record_outcome(&self, id: &str, realized_net_percent: Decimal)
    -> Result<(), StorageError>;

    /// Total number of rows.
    async fn count(&self) -> Result<i64, StorageError>;

    async fn close(&self) -> Result<(), StorageError>;
}

/// StorageError represents errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Opens the configured log: SQLite when storage is enabled, memory otherwise.
pub async fn open_log(
    config: Option<&StorageConfig>,
) -> Result<Arc<dyn OpportunityLog>, StorageError> {
    match config {
        Some(storage) if storage.enabled => {
            let path = storage.path_or_default();
            if let Some(dir) = std::path::Path::new(path).parent() {
                if !dir.as_os_str().is_empty() {
                    std::fs::create_dir_all(dir)?;
                }
            }
            let log = SqliteLog::new(SqliteLogConfig {
                path: path.to_string(),
                ..SqliteLogConfig::default()
            })
            .await?;
            Ok(Arc::new(log))
        }
        _ => {
            info!("Decision log kept in memory");
            Ok(Arc::new(MemoryLog::new()))
        }
    }
}
