//! Shared HTTP client for public venue endpoints.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{FetchError, Result};

/// Longest error body kept in an `Http` error message.
const MAX_ERROR_BODY: usize = 200;

/// HTTP client for unauthenticated GET requests.
/// Maps transport, status and body failures to `FetchError`.
#[derive(Clone)]
pub struct HttpClient {
    http: Client,
    timeout: Duration,
}

impl HttpClient {
    /// Creates a client whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("spread-scout/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "http client builder failed, using defaults");
                Client::new()
            });
        Self { http, timeout }
    }

    /// Sends a GET request and returns the raw body with its receive time.
    pub async fn get(&self, url: &str, params: &[(&str, &str)]) -> Result<(Vec<u8>, DateTime<Utc>)> {
        let url = with_query(url, params);

        debug!(url = %url, "sending request");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let received_at = Utc::now();

        let status = response.status();
        let body = response.bytes().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            return Err(parse_error_response(status, &body));
        }

        Ok((body.to_vec(), received_at))
    }

    fn transport_error(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else if e.is_decode() || e.is_body() {
            FetchError::Parse(e.to_string())
        } else {
            FetchError::Http {
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            }
        }
    }
}

/// Appends url-encoded query parameters, sorted by key.
fn with_query(url: &str, params: &[(&str, &str)]) -> String {
    if params.is_empty() {
        return url.to_string();
    }
    let mut sorted: Vec<_> = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let query = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{}{}{}", url, sep, query)
}

/// Builds an `Http` error from a non-2xx response, using the venue's
/// `msg`/`message` field when the body is JSON.
fn parse_error_response(status: StatusCode, body: &[u8]) -> FetchError {
    #[derive(Deserialize)]
    struct ErrorResponse {
        #[serde(alias = "msg", alias = "retMsg")]
        message: Option<String>,
    }

    let message = serde_json::from_slice::<ErrorResponse>(body)
        .ok()
        .and_then(|r| r.message)
        .unwrap_or_else(|| {
            let text = String::from_utf8_lossy(body);
            text.chars().take(MAX_ERROR_BODY).collect()
        });

    FetchError::Http {
        status: Some(status.as_u16()),
        message,
    }
}
