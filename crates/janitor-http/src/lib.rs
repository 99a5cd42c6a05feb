#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::multiple_crate_versions)]

//! Throttled, retrying HTTP client shared by the manager REST adapters and
//! the torrent-client adapters.
//!
//! Each named service gets its own minimum-interval pacing and a bounded
//! concurrency gate; requests that fail with a transient status or network
//! error are retried with exponential backoff plus jitter.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::Instant;

/// Failure from [`HttpClient::request`].
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// The request failed and no more retries were configured or remained.
    #[error("request to {url} failed after {attempts} attempt(s)")]
    Exhausted {
        /// URL that was being requested.
        url: String,
        /// Total attempts made, including the first.
        attempts: u32,
        /// The last underlying transport error.
        #[source]
        source: reqwest::Error,
    },
}

/// Per-request throttling and retry policy. Cloned cheaply; callers typically
/// build one per manager/client block from its resolved configuration.
#[derive(Debug, Clone, Copy)]
pub struct RequestPolicy {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Maximum retry attempts after the first, on a transient failure.
    pub retry_attempts: u32,
    /// Base backoff duration; doubles on each retry and gets up to 25% jitter added.
    pub retry_backoff: Duration,
    /// Minimum spacing between requests to the same service; `0` disables pacing.
    pub min_interval: Duration,
    /// Maximum requests to the same service running at once; `0` disables the gate.
    pub max_concurrent: usize,
}

impl Default for RequestPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            retry_attempts: 2,
            retry_backoff: Duration::from_millis(500),
            min_interval: Duration::ZERO,
            max_concurrent: 0,
        }
    }
}

/// Outcome of a completed (non-retried-away) request.
#[derive(Debug, Clone)]
pub enum ApiResponse {
    /// The body parsed as JSON.
    Json(Value),
    /// A response with no JSON body, or one that wasn't parseable; the
    /// manager adapters treat this as "request succeeded, nothing to read".
    Status {
        /// HTTP status code returned.
        status: u16,
    },
}

impl ApiResponse {
    /// The JSON body, if one was present and parsed.
    #[must_use]
    pub const fn json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Status { .. } => None,
        }
    }
}

#[derive(Debug)]
struct ThrottleState {
    last_request_at: Mutex<Option<Instant>>,
    semaphore: Semaphore,
}

impl ThrottleState {
    fn new(max_concurrent: usize) -> Self {
        Self { last_request_at: Mutex::new(None), semaphore: Semaphore::new(max_concurrent.max(1)) }
    }
}

/// Shared HTTP client with per-service pacing and concurrency limits.
pub struct HttpClient {
    inner: reqwest::Client,
    throttles: Mutex<HashMap<String, Arc<ThrottleState>>>,
}

impl HttpClient {
    /// Build a client wrapping a fresh `reqwest::Client`.
    #[must_use]
    pub fn new() -> Self {
        Self { inner: reqwest::Client::new(), throttles: Mutex::new(HashMap::new()) }
    }

    async fn throttle_for(&self, service: &str, max_concurrent: usize) -> Arc<ThrottleState> {
        let mut throttles = self.throttles.lock().await;
        throttles
            .entry(service.to_string())
            .or_insert_with(|| Arc::new(ThrottleState::new(max_concurrent)))
            .clone()
    }

    async fn wait_for_pacing(&self, throttle: &ThrottleState, min_interval: Duration) {
        if min_interval.is_zero() {
            return;
        }
        let mut last = throttle.last_request_at.lock().await;
        let now = Instant::now();
        if let Some(previous) = *last {
            let elapsed = now.duration_since(previous);
            if elapsed < min_interval {
                tokio::time::sleep(min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Issue `method url` against `service`, applying `policy`'s pacing,
    /// concurrency gate, and retry rules. `api_key` is sent as `X-Api-Key`
    /// when present; `json_body` is serialized as the request body.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Exhausted`] once the final retry attempt still
    /// fails with a transient or connection-level error.
    pub async fn request(
        &self,
        service: &str,
        method: reqwest::Method,
        url: &str,
        api_key: Option<&str>,
        query: &[(&str, &str)],
        json_body: Option<&Value>,
        policy: RequestPolicy,
    ) -> Result<ApiResponse, HttpError> {
        let throttle = self.throttle_for(service, policy.max_concurrent).await;
        let _permit = if policy.max_concurrent > 0 {
            Some(throttle.semaphore.acquire().await.expect("throttle semaphore is never closed"))
        } else {
            None
        };
        self.wait_for_pacing(&throttle, policy.min_interval).await;

        let mut attempt: u32 = 0;
        loop {
            let mut builder = self.inner.request(method.clone(), url).timeout(policy.timeout).query(query);
            if let Some(key) = api_key {
                builder = builder.header("X-Api-Key", key);
            }
            if let Some(body) = json_body {
                builder = builder.json(body);
            }

            match builder.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() || !is_retryable_status(status.as_u16()) || attempt >= policy.retry_attempts {
                        return Ok(parse_response(response).await);
                    }
                    tracing::warn!(service, url, status = status.as_u16(), attempt, "retryable HTTP status, backing off");
                }
                Err(source) => {
                    if !is_retryable_transport(&source) || attempt >= policy.retry_attempts {
                        return Err(HttpError::Exhausted { url: url.to_string(), attempts: attempt + 1, source });
                    }
                    tracing::warn!(service, url, attempt, error = %source, "transport error, backing off");
                }
            }

            tokio::time::sleep(backoff_with_jitter(policy.retry_backoff, attempt)).await;
            attempt += 1;
        }
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

async fn parse_response(response: reqwest::Response) -> ApiResponse {
    let status = response.status().as_u16();
    let is_json = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains("application/json"));
    if status == 204 || !is_json {
        return ApiResponse::Status { status };
    }
    match response.json::<Value>().await {
        Ok(value) => ApiResponse::Json(value),
        Err(_) => ApiResponse::Status { status },
    }
}

fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

fn is_retryable_transport(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

fn backoff_with_jitter(base: Duration, attempt: u32) -> Duration {
    let multiplier = 2_u32.saturating_pow(attempt);
    let scaled = base.saturating_mul(multiplier);
    let jitter_fraction: f64 = rand::random::<f64>() * 0.25;
    let jitter = Duration::from_secs_f64(scaled.as_secs_f64() * jitter_fraction);
    scaled + jitter
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_status_covers_429_and_5xx() {
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(500));
        assert!(is_retryable_status(503));
        assert!(!is_retryable_status(404));
        assert!(!is_retryable_status(200));
    }

    #[test]
    fn backoff_grows_and_stays_above_base() {
        let base = Duration::from_millis(100);
        let first = backoff_with_jitter(base, 0);
        let second = backoff_with_jitter(base, 1);
        assert!(first >= base);
        assert!(second >= base * 2);
    }

    #[tokio::test]
    async fn throttle_state_is_reused_across_calls() {
        let client = HttpClient::new();
        let first = client.throttle_for("Sonarr", 2).await;
        let second = client.throttle_for("Sonarr", 2).await;
        assert!(Arc::ptr_eq(&first, &second));
    }
}
