//! Bybit v5 spot tickers adapter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::utils::{TopOfBook, build_quote, decode, parse_decimal, timestamp_from_millis};
use super::{FetchError, HttpClient, Result, VenueAdapter};
use crate::domain::{Pair, Quote};

const BASE_URL: &str = "https://api.bybit.com";
const TICKERS_PATH: &str = "/v5/market/tickers";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Response {
    ret_code: i64,
    #[serde(default)]
    ret_msg: String,
    result: Option<TickerList>,
    time: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct TickerList {
    #[serde(default)]
    list: Vec<Ticker>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ticker {
    bid1_price: String,
    bid1_size: String,
    ask1_price: String,
    ask1_size: String,
}

/// Bybit adapter. Symbols are concatenated ("BTCUSDT").
pub struct BybitAdapter {
    name: String,
    base_url: String,
    http: HttpClient,
}

impl BybitAdapter {
    pub fn new(name: &str, base_url: Option<&str>, http: HttpClient) -> Self {
        Self {
            name: name.to_string(),
            base_url: base_url.unwrap_or(BASE_URL).trim_end_matches('/').to_string(),
            http,
        }
    }

    pub(crate) fn parse(&self, pair: &Pair, body: &[u8], received_at: DateTime<Utc>) -> Result<Quote> {
        let resp: Response = decode(body)?;
        if resp.ret_code != 0 {
            return Err(FetchError::Http {
                status: None,
                message: format!("retCode {}: {}", resp.ret_code, resp.ret_msg),
            });
        }
        let ticker = resp
            .result
            .and_then(|r| r.list.into_iter().next())
            .ok_or_else(|| FetchError::Parse("empty ticker list".into()))?;

        let book = TopOfBook {
            bid_price: parse_decimal("bid1Price", &ticker.bid1_price)?,
            bid_size: parse_decimal("bid1Size", &ticker.bid1_size)?,
            ask_price: parse_decimal("ask1Price", &ticker.ask1_price)?,
            ask_size: parse_decimal("ask1Size", &ticker.ask1_size)?,
            timestamp: resp.time.and_then(timestamp_from_millis),
        };
        build_quote(&self.name, pair, book, received_at)
    }
}

#[async_trait]
impl VenueAdapter for BybitAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_quote(&self, pair: &Pair) -> Result<Quote> {
        let url = format!("{}{}", self.base_url, TICKERS_PATH);
        let symbol = pair.symbol("");
        let (body, received_at) = self
            .http
            .get(&url, &[("category", "spot"), ("symbol", symbol.as_str())])
            .await?;
        self.parse(pair, &body, received_at)
    }
}
