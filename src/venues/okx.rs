//! OKX v5 ticker adapter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::utils::{TopOfBook, build_quote, decode, parse_decimal, timestamp_from_millis};
use super::{FetchError, HttpClient, Result, VenueAdapter};
use crate::domain::{Pair, Quote};

const BASE_URL: &str = "https://www.okx.com";
const TICKER_PATH: &str = "/api/v5/market/ticker";

#[derive(Debug, Deserialize)]
struct Response {
    code: String,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: Vec<Ticker>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ticker {
    bid_px: String,
    bid_sz: String,
    ask_px: String,
    ask_sz: String,
    ts: Option<String>,
}

/// OKX adapter. Instrument ids are dash-separated ("BTC-USDT").
pub struct OkxAdapter {
    name: String,
    base_url: String,
    http: HttpClient,
}

impl OkxAdapter {
    pub fn new(name: &str, base_url: Option<&str>, http: HttpClient) -> Self {
        Self {
            name: name.to_string(),
            base_url: base_url.unwrap_or(BASE_URL).trim_end_matches('/').to_string(),
            http,
        }
    }

    pub(crate) fn parse(&self, pair: &Pair, body: &[u8], received_at: DateTime<Utc>) -> Result<Quote> {
        let resp: Response = decode(body)?;
        if resp.code != "0" {
            return Err(FetchError::Http {
                status: None,
                message: format!("code {}: {}", resp.code, resp.msg),
            });
        }
        let ticker = resp
            .data
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::Parse("empty ticker data".into()))?;

        let timestamp = ticker
            .ts
            .as_deref()
            .and_then(|ts| ts.parse::<i64>().ok())
            .and_then(timestamp_from_millis);

        let book = TopOfBook {
            bid_price: parse_decimal("bidPx", &ticker.bid_px)?,
            bid_size: parse_decimal("bidSz", &ticker.bid_sz)?,
            ask_price: parse_decimal("askPx", &ticker.ask_px)?,
            ask_size: parse_decimal("askSz", &ticker.ask_sz)?,
            timestamp,
        };
        build_quote(&self.name, pair, book, received_at)
    }
}

#[async_trait]
impl VenueAdapter for OkxAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_quote(&self, pair: &Pair) -> Result<Quote> {
        let url = format!("{}{}", self.base_url, TICKER_PATH);
        let inst_id = pair.symbol("-");
        let (body, received_at) = self.http.get(&url, &[("instId", inst_id.as_str())]).await?;
        self.parse(pair, &body, received_at)
    }
}
