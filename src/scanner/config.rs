//! Scanner construction options.

use crate::config::Config;

/// Scanner configuration options.
pub struct ScannerConfig {
    /// Application configuration; becomes the initial runtime snapshot.
    pub app_config: Config,
    /// Application version, reported in the startup event.
    pub version: String,
}

impl ScannerConfig {
    pub fn new(app_config: Config) -> Self {
        Self {
            app_config,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
