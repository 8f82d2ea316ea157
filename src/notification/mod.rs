//! Operational notifications: startup, shutdown, overviews, errors and
//! forwarded opportunity alerts.

mod notifier;
mod telegram;

pub use notifier::*;
pub use telegram::{TelegramNotifier, TelegramSettings};

use std::sync::Arc;
use tracing::info;

use crate::config::NotificationConfig;

/// Builds the configured notifier; a no-op one when nothing is enabled.
pub fn build_notifier(
    config: Option<&NotificationConfig>,
) -> Result<Arc<dyn Notifier>, NotificationError> {
    let telegram = config
        .and_then(|n| n.telegram.as_ref())
        .filter(|t| t.enabled);

    match telegram {
        Some(cfg) => {
            let notifier = TelegramNotifier::new(TelegramSettings::from(cfg))?;
            info!("Telegram notifications enabled");
            Ok(Arc::new(MultiNotifier::new(vec![Arc::new(notifier)])))
        }
        None => Ok(Arc::new(NoopNotifier::new())),
    }
}
