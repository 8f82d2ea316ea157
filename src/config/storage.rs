//! Decision log storage configuration.

use serde::Deserialize;

/// Decision log settings. When disabled the log lives in memory only.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Persist the log to SQLite.
    #[serde(default)]
    pub enabled: bool,
    /// Path to the SQLite database file (default: data/decisions.db).
    pub path: Option<String>,
}

impl StorageConfig {
    pub fn path_or_default(&self) -> &str {
        self.path.as_deref().unwrap_or("data/decisions.db")
    }
}
