//! Registry of the venue adapters a scan fans out to.

use super::{
    BinanceAdapter, BybitAdapter, GenericAdapter, HttpClient, KucoinAdapter, OkxAdapter,
    P2pAdapter, StaticAdapter, VenueAdapter,
};
use crate::config::{Config, VenueConfig, VenueKind};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Errors raised while building or editing the registry.
#[derive(Debug, Error)]
pub enum VenueError {
    #[error("venue {0}: unknown adapter kind")]
    UnknownKind(String),

    #[error("venue {0}: generic adapter requires an endpoint")]
    MissingEndpoint(String),

    #[error("venue {venue}: invalid p2p section: {reason}")]
    InvalidP2p { venue: String, reason: String },

    #[error("adapter {0} not found")]
    NotFound(String),
}

/// AdapterRegistry maps adapter names to adapter instances.
pub struct AdapterRegistry {
    adapters: Arc<RwLock<BTreeMap<String, Arc<dyn VenueAdapter>>>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self {
            adapters: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Builds adapters for every enabled venue. Venues with the p2p
    /// capability get a second adapter named "<venue>:p2p".
    pub async fn from_config(config: &Config) -> Result<Self, VenueError> {
        let registry = Self::new();
        let http = HttpClient::new(config.collector.timeout);

        for (name, venue) in &config.venues {
            if !venue.enabled {
                info!(venue = %name, "Skipping disabled venue");
                continue;
            }

            info!(venue = %name, "Loading venue from config");

            if venue.capabilities.spot {
                let adapter = Self::create_adapter(name, venue, &http)?;
                registry.register(adapter).await;
            }

            if venue.capabilities.p2p {
                let p2p = venue.p2p.as_ref().ok_or_else(|| VenueError::InvalidP2p {
                    venue: name.clone(),
                    reason: "missing p2p section".into(),
                })?;
                let adapter = P2pAdapter::new(name, p2p, config.p2p.clone(), http.clone())
                    .map_err(|e| VenueError::InvalidP2p {
                        venue: name.clone(),
                        reason: e.to_string(),
                    })?;
                registry.register(Arc::new(adapter)).await;
            }
        }

        Ok(registry)
    }

    /// Factory for the spot adapter of a venue; the kind defaults from the name.
    fn create_adapter(
        name: &str,
        config: &VenueConfig,
        http: &HttpClient,
    ) -> Result<Arc<dyn VenueAdapter>, VenueError> {
        let kind = config
            .kind
            .or_else(|| VenueKind::from_name(name))
            .ok_or_else(|| VenueError::UnknownKind(name.to_string()))?;
        let endpoint = config.endpoint.as_deref();

        let adapter: Arc<dyn VenueAdapter> = match kind {
            VenueKind::Binance => Arc::new(BinanceAdapter::new(name, endpoint, http.clone())),
            VenueKind::Bybit => Arc::new(BybitAdapter::new(name, endpoint, http.clone())),
            VenueKind::Kucoin => Arc::new(KucoinAdapter::new(name, endpoint, http.clone())),
            VenueKind::Okx => Arc::new(OkxAdapter::new(name, endpoint, http.clone())),
            VenueKind::Generic => {
                let template =
                    endpoint.ok_or_else(|| VenueError::MissingEndpoint(name.to_string()))?;
                Arc::new(GenericAdapter::new(name, template, http.clone()))
            }
            VenueKind::Static => {
                Arc::new(StaticAdapter::new(name, config.static_quotes.clone()))
            }
        };
        Ok(adapter)
    }

    /// Registers an adapter, replacing any adapter with the same name.
    pub async fn register(&self, adapter: Arc<dyn VenueAdapter>) {
        let name = adapter.name().to_string();
        let mut adapters = self.adapters.write().await;
        info!(venue = %name, "Registering venue adapter");
        adapters.insert(name, adapter);
    }

    pub async fn unregister(&self, name: &str) -> Result<(), VenueError> {
        let mut adapters = self.adapters.write().await;
        if adapters.remove(name).is_some() {
            info!(venue = %name, "Unregistered venue adapter");
            Ok(())
        } else {
            warn!(venue = %name, "Attempted to unregister unknown venue adapter");
            Err(VenueError::NotFound(name.to_string()))
        }
    }

    pub async fn get(&self, name: &str) -> Option<Arc<dyn VenueAdapter>> {
        let adapters = self.adapters.read().await;
        adapters.get(name).cloned()
    }

    /// Registered adapter names in lexical order.
    pub async fn list(&self) -> Vec<String> {
        let adapters = self.adapters.read().await;
        adapters.keys().cloned().collect()
    }

    /// Snapshot of the registered adapters, in name order.
    pub async fn adapters(&self) -> Vec<Arc<dyn VenueAdapter>> {
        let adapters = self.adapters.read().await;
        adapters.values().cloned().collect()
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
