//! Binance spot book ticker adapter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::utils::{TopOfBook, build_quote, decode, parse_decimal};
use super::{HttpClient, Result, VenueAdapter};
use crate::domain::{Pair, Quote};

const BASE_URL: &str = "https://api.binance.com";
const BOOK_TICKER_PATH: &str = "/api/v3/ticker/bookTicker";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookTicker {
    bid_price: String,
    bid_qty: String,
    ask_price: String,
    ask_qty: String,
}

/// Binance adapter. Symbols are concatenated ("BTCUSDT").
pub struct BinanceAdapter {
    name: String,
    base_url: String,
    http: HttpClient,
}

impl BinanceAdapter {
    pub fn new(name: &str, base_url: Option<&str>, http: HttpClient) -> Self {
        Self {
            name: name.to_string(),
            base_url: base_url.unwrap_or(BASE_URL).trim_end_matches('/').to_string(),
            http,
        }
    }

    /// Parses a bookTicker body. The endpoint carries no timestamp, so the
    /// receive time is used.
    pub(crate) fn parse(&self, pair: &Pair, body: &[u8], received_at: DateTime<Utc>) -> Result<Quote> {
        let t: BookTicker = decode(body)?;
        let book = TopOfBook {
            bid_price: parse_decimal("bidPrice", &t.bid_price)?,
            bid_size: parse_decimal("bidQty", &t.bid_qty)?,
            ask_price: parse_decimal("askPrice", &t.ask_price)?,
            ask_size: parse_decimal("askQty", &t.ask_qty)?,
            timestamp: None,
        };
        build_quote(&self.name, pair, book, received_at)
    }
}

#[async_trait]
impl VenueAdapter for BinanceAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_quote(&self, pair: &Pair) -> Result<Quote> {
        let url = format!("{}{}", self.base_url, BOOK_TICKER_PATH);
        let symbol = pair.symbol("");
        let (body, received_at) = self.http.get(&url, &[("symbol", symbol.as_str())]).await?;
        self.parse(pair, &body, received_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::venues::FetchError;
    use crate::venues::http::testing::serve_once;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn adapter(base: &str) -> BinanceAdapter {
        BinanceAdapter::new("binance", Some(base), HttpClient::new(Duration::from_secs(2)))
    }

    #[test]
    fn test_parse_book_ticker() {
        let a = adapter("http://unused");
        let pair = Pair::parse("BTC/USDT").unwrap();
        let now = Utc::now();
        let body = br#"{"symbol":"BTCUSDT","bidPrice":"27000.10","bidQty":"1.5","askPrice":"27000.20","askQty":"0.75"}"#;

        let q = a.parse(&pair, body, now).unwrap();
        assert_eq!(q.venue, "binance");
        assert_eq!(q.bid_price, dec!(27000.10));
        assert_eq!(q.bid_size, dec!(1.5));
        assert_eq!(q.ask_price, dec!(27000.20));
        assert_eq!(q.ask_size, dec!(0.75));
        assert_eq!(q.timestamp, now);
    }

    #[test]
    fn test_parse_malformed_payload() {
        let a = adapter("http://unused");
        let pair = Pair::parse("BTC/USDT").unwrap();

        let err = a.parse(&pair, b"<html>", Utc::now()).unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));

        let err = a
            .parse(
                &pair,
                br#"{"bidPrice":"x","bidQty":"1","askPrice":"2","askQty":"1"}"#,
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[tokio::test]
    async fn test_fetch_quote_requests_concatenated_symbol() {
        let (base, request) = serve_once(
            200,
            r#"{"symbol":"ETHUSDT","bidPrice":"1800.5","bidQty":"3","askPrice":"1800.6","askQty":"4"}"#,
            Duration::ZERO,
        )
        .await;

        let q = adapter(&base)
            .fetch_quote(&Pair::parse("ETH/USDT").unwrap())
            .await
            .unwrap();
        assert_eq!(q.bid_price, dec!(1800.5));
        assert_eq!(
            request.await.unwrap(),
            "GET /api/v3/ticker/bookTicker?symbol=ETHUSDT HTTP/1.1"
        );
    }
}
