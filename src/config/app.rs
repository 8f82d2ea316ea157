//! Application-level configuration.

use serde::Deserialize;

/// Application-level settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Application name used in logs and notifications.
    pub name: String,
    /// Environment: "development", "staging", or "production".
    #[serde(default = "default_env")]
    pub env: String,
    /// Logging verbosity: "debug", "info", "warn", "error".
    pub log_level: Option<String>,
}

fn default_env() -> String {
    "development".to_string()
}
