//! KuCoin level-1 orderbook adapter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::utils::{TopOfBook, build_quote, decode, parse_decimal, timestamp_from_millis};
use super::{FetchError, HttpClient, Result, VenueAdapter};
use crate::domain::{Pair, Quote};

const BASE_URL: &str = "https://api.kucoin.com";
const LEVEL1_PATH: &str = "/api/v1/market/orderbook/level1";
const CODE_OK: &str = "200000";

#[derive(Debug, Deserialize)]
struct Response {
    code: String,
    #[serde(default)]
    msg: String,
    data: Option<Level1>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Level1 {
    time: Option<i64>,
    best_bid: String,
    best_bid_size: String,
    best_ask: String,
    best_ask_size: String,
}

/// KuCoin adapter. Symbols are dash-separated ("BTC-USDT").
pub struct KucoinAdapter {
    name: String,
    base_url: String,
    http: HttpClient,
}

impl KucoinAdapter {
    pub fn new(name: &str, base_url: Option<&str>, http: HttpClient) -> Self {
        Self {
            name: name.to_string(),
            base_url: base_url.unwrap_or(BASE_URL).trim_end_matches('/').to_string(),
            http,
        }
    }

    pub(crate) fn parse(&self, pair: &Pair, body: &[u8], received_at: DateTime<Utc>) -> Result<Quote> {
        let resp: Response = decode(body)?;
        if resp.code != CODE_OK {
            return Err(FetchError::Http {
                status: None,
                message: format!("code {}: {}", resp.code, resp.msg),
            });
        }
        // Unknown symbols come back as a success with null data.
        let data = resp
            .data
            .ok_or_else(|| FetchError::Parse(format!("no level1 data for {}", pair)))?;

        let book = TopOfBook {
            bid_price: parse_decimal("bestBid", &data.best_bid)?,
            bid_size: parse_decimal("bestBidSize", &data.best_bid_size)?,
            ask_price: parse_decimal("bestAsk", &data.best_ask)?,
            ask_size: parse_decimal("bestAskSize", &data.best_ask_size)?,
            timestamp: data.time.and_then(timestamp_from_millis),
        };
        build_quote(&self.name, pair, book, received_at)
    }
}

#[async_trait]
impl VenueAdapter for KucoinAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_quote(&self, pair: &Pair) -> Result<Quote> {
        let url = format!("{}{}", self.base_url, LEVEL1_PATH);
        let symbol = pair.symbol("-");
        let (body, received_at) = self.http.get(&url, &[("symbol", symbol.as_str())]).await?;
        self.parse(pair, &body, received_at)
    }
}
