//! Adapter for endpoints that already serve the canonical quote shape.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use super::utils::{TopOfBook, build_quote, decode, timestamp_from_millis};
use super::{HttpClient, Result, VenueAdapter};
use crate::domain::{Pair, Quote};

/// `{bid_price, bid_size, ask_price, ask_size, timestamp}`; numbers may be
/// JSON numbers or strings, timestamp in milliseconds.
#[derive(Debug, Deserialize)]
struct CanonicalQuote {
    bid_price: Decimal,
    #[serde(default)]
    bid_size: Decimal,
    ask_price: Decimal,
    #[serde(default)]
    ask_size: Decimal,
    timestamp: Option<i64>,
}

/// Generic adapter driven by an endpoint template.
///
/// Placeholders: `{symbol}` (BTCUSDT), `{symbol_dash}` (BTC-USDT),
/// `{symbol_underscore}` (BTC_USDT), `{base}`, `{quote}` and the `_lower`
/// variants of each.
pub struct GenericAdapter {
    name: String,
    template: String,
    http: HttpClient,
}

impl GenericAdapter {
    pub fn new(name: &str, template: &str, http: HttpClient) -> Self {
        Self {
            name: name.to_string(),
            template: template.to_string(),
            http,
        }
    }

    pub(crate) fn url_for(&self, pair: &Pair) -> String {
        let substitutions = [
            ("{symbol}", pair.symbol("")),
            ("{symbol_dash}", pair.symbol("-")),
            ("{symbol_underscore}", pair.symbol("_")),
            ("{base}", pair.base().to_string()),
            ("{quote}", pair.quote().to_string()),
        ];

        let mut url = self.template.clone();
        for (key, value) in substitutions {
            let lower_key = key.replace('}', "_lower}");
            url = url
                .replace(&lower_key, &value.to_ascii_lowercase())
                .replace(key, &value);
        }
        url
    }

    pub(crate) fn parse(&self, pair: &Pair, body: &[u8], received_at: DateTime<Utc>) -> Result<Quote> {
        let q: CanonicalQuote = decode(body)?;
        let book = TopOfBook {
            bid_price: q.bid_price,
            bid_size: q.bid_size,
            ask_price: q.ask_price,
            ask_size: q.ask_size,
            timestamp: q.timestamp.and_then(timestamp_from_millis),
        };
        build_quote(&self.name, pair, book, received_at)
    }
}

#[async_trait]
impl VenueAdapter for GenericAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_quote(&self, pair: &Pair) -> Result<Quote> {
        let url = self.url_for(pair);
        let (body, received_at) = self.http.get(&url, &[]).await?;
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

    fn http() -> HttpClient {
        HttpClient::new(Duration::from_secs(2))
    }

    #[test]
    fn test_url_placeholders() {
        let pair = Pair::parse("BTC/USDT").unwrap();

        let a = GenericAdapter::new("x", "https://q.example/{symbol}", http());
        assert_eq!(a.url_for(&pair), "https://q.example/BTCUSDT");

        let a = GenericAdapter::new(
            "x",
            "https://q.example/{base_lower}/{quote_lower}?s={symbol_dash}",
            http(),
        );
        assert_eq!(a.url_for(&pair), "https://q.example/btc/usdt?s=BTC-USDT");

        let a = GenericAdapter::new("x", "https://q.example/{symbol_underscore_lower}", http());
        assert_eq!(a.url_for(&pair), "https://q.example/btc_usdt");
    }

    #[test]
    fn test_parse_numbers_and_strings() {
        let a = GenericAdapter::new("mirror", "http://unused", http());
        let pair = Pair::parse("BTC/USDT").unwrap();

        let q = a
            .parse(
                &pair,
                br#"{"bid_price":"100.5","bid_size":2,"ask_price":101,"ask_size":"1","timestamp":1700000000000}"#,
                Utc::now(),
            )
            .unwrap();
        assert_eq!(q.bid_price, dec!(100.5));
        assert_eq!(q.bid_size, dec!(2));
        assert_eq!(q.ask_price, dec!(101));
        assert_eq!(q.timestamp.timestamp_millis(), 1_700_000_000_000);

        let err = a.parse(&pair, br#"{"bid_price":"1"}"#, Utc::now()).unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[tokio::test]
    async fn test_fetch_quote_from_template() {
        let (base, request) = serve_once(
            200,
            r#"{"bid_price":"99","bid_size":"1","ask_price":"100","ask_size":"1"}"#,
            Duration::ZERO,
        )
        .await;
        let a = GenericAdapter::new("mirror", &format!("{}/quotes/{{symbol_dash}}", base), http());

        let q = a.fetch_quote(&Pair::parse("SOL/USDC").unwrap()).await.unwrap();
        assert_eq!(q.venue, "mirror");
        assert_eq!(q.ask_price, dec!(100));
        assert_eq!(request.await.unwrap(), "GET /quotes/SOL-USDC HTTP/1.1");
    }
}
