//! P2P offer book adapter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use super::utils::decode;
use super::{FetchError, HttpClient, Result, VenueAdapter, p2p_adapter_name};
use crate::config::{P2pConfig, VenueP2pConfig};
use crate::domain::{P2pOffer, Pair, Quote};
use crate::engine::synthesize_p2p_quote;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OfferPayload {
    Wrapped { offers: Vec<P2pOffer> },
    Bare(Vec<P2pOffer>),
}

impl OfferPayload {
    fn into_offers(self) -> Vec<P2pOffer> {
        match self {
            OfferPayload::Wrapped { offers } | OfferPayload::Bare(offers) => offers,
        }
    }
}

/// P2pAdapter turns a venue's offer list into a synthesized quote for the
/// venue's asset/fiat pair. Its name is "<venue>:p2p".
pub struct P2pAdapter {
    name: String,
    pair: Pair,
    url: String,
    filter: P2pConfig,
    http: HttpClient,
}

impl P2pAdapter {
    pub fn new(
        venue: &str,
        config: &VenueP2pConfig,
        filter: P2pConfig,
        http: HttpClient,
    ) -> std::result::Result<Self, crate::domain::PairError> {
        let pair = config.pair()?;
        let url = config
            .endpoint
            .replace("{asset}", pair.base())
            .replace("{fiat}", pair.quote());
        Ok(Self {
            name: p2p_adapter_name(venue),
            pair,
            url,
            filter,
            http,
        })
    }

    pub(crate) fn parse(&self, body: &[u8], received_at: DateTime<Utc>) -> Result<Quote> {
        let offers = decode::<OfferPayload>(body)?.into_offers();
        debug!(venue = %self.name, offers = offers.len(), "p2p offers received");
        synthesize_p2p_quote(&self.name, &self.pair, &offers, &self.filter, received_at)
            .ok_or_else(|| FetchError::Parse(format!("no qualifying offers on both sides for {}", self.pair)))
    }
}

#[async_trait]
impl VenueAdapter for P2pAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports(&self, pair: &Pair) -> bool {
        *pair == self.pair
    }

    async fn fetch_quote(&self, pair: &Pair) -> Result<Quote> {
        if !self.supports(pair) {
            return Err(FetchError::Parse(format!("{} only quotes {}", self.name, self.pair)));
        }
        let (body, received_at) = self.http.get(&self.url, &[]).await?;
        self.parse(&body, received_at)
    }
}
