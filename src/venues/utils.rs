//! Common helpers for adapter implementations.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;

use super::{FetchError, Result};
use crate::domain::{Pair, Quote, QuoteSource};

/// Millisecond timestamps are at least this large; smaller values are seconds.
const MIN_MILLIS_TIMESTAMP: i64 = 10_000_000_000;

/// Top of book as reported by a venue, before sanity checks.
pub(crate) struct TopOfBook {
    pub bid_price: Decimal,
    pub bid_size: Decimal,
    pub ask_price: Decimal,
    pub ask_size: Decimal,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Decodes a JSON body, mapping failures to `FetchError::Parse`.
pub(crate) fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| FetchError::Parse(e.to_string()))
}

/// Parses a numeric string field such as "27123.45" or "1.5e-3".
pub(crate) fn parse_decimal(field: &str, raw: &str) -> Result<Decimal> {
    let raw = raw.trim();
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|_| FetchError::Parse(format!("{}: invalid number {:?}", field, raw)))
}

/// Converts a venue timestamp in milliseconds (or seconds) to UTC.
pub(crate) fn timestamp_from_millis(value: i64) -> Option<DateTime<Utc>> {
    let millis = if value < MIN_MILLIS_TIMESTAMP {
        value.checked_mul(1000)?
    } else {
        value
    };
    DateTime::from_timestamp_millis(millis)
}

/// Builds a ticker quote, rejecting non-positive prices, negative sizes and
/// crossed books. A missing venue timestamp falls back to `received_at`.
pub(crate) fn build_quote(
    venue: &str,
    pair: &Pair,
    book: TopOfBook,
    received_at: DateTime<Utc>,
) -> Result<Quote> {
    if book.bid_price <= Decimal::ZERO || book.ask_price <= Decimal::ZERO {
        return Err(FetchError::Parse(format!(
            "non-positive price bid={} ask={}",
            book.bid_price, book.ask_price
        )));
    }
    if book.bid_size < Decimal::ZERO || book.ask_size < Decimal::ZERO {
        return Err(FetchError::Parse("negative size".into()));
    }
    if book.bid_price >= book.ask_price {
        return Err(FetchError::Parse(format!(
            "crossed book bid={} ask={}",
            book.bid_price, book.ask_price
        )));
    }

    Ok(Quote {
        venue: venue.to_string(),
        pair: pair.clone(),
        bid_price: book.bid_price,
        bid_size: book.bid_size,
        ask_price: book.ask_price,
        ask_size: book.ask_size,
        timestamp: book.timestamp.unwrap_or(received_at),
        source: QuoteSource::Ticker,
    })
}
