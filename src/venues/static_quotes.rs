//! Offline venue serving configured quotes.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;

use super::utils::{TopOfBook, build_quote};
use super::{FetchError, Result, VenueAdapter};
use crate::config::StaticQuote;
use crate::domain::{Pair, Quote, QuoteSource};

/// StaticAdapter answers from a fixed table, stamping quotes with the
/// current time. Used for dry runs and demos without network access.
pub struct StaticAdapter {
    name: String,
    quotes: HashMap<Pair, StaticQuote>,
}

impl StaticAdapter {
    pub fn new(name: &str, quotes: HashMap<Pair, StaticQuote>) -> Self {
        Self {
            name: name.to_string(),
            quotes,
        }
    }
}

#[async_trait]
impl VenueAdapter for StaticAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports(&self, pair: &Pair) -> bool {
        self.quotes.contains_key(pair)
    }

    async fn fetch_quote(&self, pair: &Pair) -> Result<Quote> {
        let q = self
            .quotes
            .get(pair)
            .ok_or_else(|| FetchError::Parse(format!("no static quote for {}", pair)))?;
        let book = TopOfBook {
            bid_price: q.bid,
            bid_size: q.bid_size,
            ask_price: q.ask,
            ask_size: q.ask_size,
            timestamp: None,
        };
        let mut quote = build_quote(&self.name, pair, book, Utc::now())?;
        quote.source = QuoteSource::Static;
        Ok(quote)
    }
}
