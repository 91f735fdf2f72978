//! HTTP fetch orchestration for the Overpass API.
//!
//! This module provides the reqwest-backed [`PoiFetcher`] with:
//! - A fixed ordered list of fallback endpoints, tried in order
//! - Bounded retry per endpoint with linear backoff on transient failures
//! - A per-attempt timeout enforced by the client (cancellation, not polling)
//!
//! The orchestrator knows nothing about routes or POI categories; it takes an
//! opaque query string and returns raw elements.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::overpass::{FetchError, PoiFetcher, RawElement};

/// Public Overpass mirrors, tried in order until one answers.
const OVERPASS_ENDPOINTS: [&str; 3] = [
    "https://overpass-api.de/api/interpreter",
    "https://overpass.kumi.systems/api/interpreter",
    "https://maps.mail.ru/osm/tools/overpass/api/interpreter",
];

const REQUEST_TIMEOUT: Duration = Duration::from_secs(35);
const MAX_RETRIES_PER_ENDPOINT: u32 = 2;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(400);

/// Overpass response envelope; only the element list matters here.
#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<RawElement>,
}

/// Outcome of a single request attempt, classified for the retry loop.
#[derive(Debug)]
enum AttemptOutcome {
    Success(Vec<RawElement>),
    /// Transient condition; retry the same endpoint after backoff.
    Retry(String),
    /// Non-retryable failure; skip remaining attempts on this endpoint.
    AbortEndpoint(String),
}

/// Statuses that warrant retrying the same endpoint.
fn is_transient_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

/// Linear backoff before retrying the same endpoint.
fn backoff_delay(attempt: u32) -> Duration {
    RETRY_BASE_DELAY * attempt
}

/// Reqwest-backed [`PoiFetcher`] with endpoint fallback.
///
/// # Example
/// ```no_run
/// use route_pois::OverpassFetcher;
///
/// let fetcher = OverpassFetcher::new().unwrap();
/// # let _ = fetcher;
/// ```
pub struct OverpassFetcher {
    client: Client,
    endpoints: Vec<String>,
}

impl OverpassFetcher {
    /// Create a fetcher over the public Overpass mirrors.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be constructed.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_endpoints(OVERPASS_ENDPOINTS.iter().map(|s| s.to_string()).collect())
    }

    /// Create a fetcher over an explicit endpoint list, tried in order.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be constructed.
    pub fn with_endpoints(endpoints: Vec<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, endpoints })
    }

    async fn attempt(&self, endpoint: &str, query: &str) -> AttemptOutcome {
        let response = self
            .client
            .post(endpoint)
            .form(&[("data", query)])
            .send()
            .await;

        match response {
            Ok(resp) => {
                let status = resp.status();
                if is_transient_status(status) {
                    return AttemptOutcome::Retry(format!("status {}", status.as_u16()));
                }
                if !status.is_success() {
                    return AttemptOutcome::AbortEndpoint(format!("status {}", status.as_u16()));
                }
                match resp.json::<OverpassResponse>().await {
                    Ok(body) => AttemptOutcome::Success(body.elements),
                    Err(e) => AttemptOutcome::AbortEndpoint(format!("decode error: {e}")),
                }
            }
            // Timeouts and connection failures skip straight to the next
            // endpoint; only the transient statuses above warrant a retry.
            Err(e) => AttemptOutcome::AbortEndpoint(format!("request error: {e}")),
        }
    }
}

#[async_trait]
impl PoiFetcher for OverpassFetcher {
    async fn fetch_batch(&self, query: &str) -> Result<Vec<RawElement>, FetchError> {
        let mut last_failure = "no endpoints configured".to_string();

        for endpoint in &self.endpoints {
            for attempt in 1..=MAX_RETRIES_PER_ENDPOINT {
                match self.attempt(endpoint, query).await {
                    AttemptOutcome::Success(elements) => {
                        debug!(
                            "fetched {} elements from {endpoint} (attempt {attempt})",
                            elements.len()
                        );
                        return Ok(elements);
                    }
                    AttemptOutcome::Retry(detail) => {
                        let transient = FetchError::Transient {
                            endpoint: endpoint.clone(),
                            detail,
                        };
                        warn!("{transient}; attempt {attempt}/{MAX_RETRIES_PER_ENDPOINT}");
                        last_failure = transient.to_string();
                        tokio::time::sleep(backoff_delay(attempt)).await;
                    }
                    AttemptOutcome::AbortEndpoint(detail) => {
                        warn!("{endpoint} failed without retry: {detail}");
                        last_failure = format!("{endpoint}#{attempt}: {detail}");
                        break;
                    }
                }
            }
        }

        Err(FetchError::AllEndpointsExhausted { last: last_failure })
    }
}
