//! Retrying HTTP layer shared by every provider adapter.
//!
//! Network trouble degrades to data absence: callers receive `Some(json)`
//! or `None`, never an error. The retry loop is generic over the attempt
//! future so classification and backoff can be tested without a network.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::config::HttpConfig;

/// Outcome of a single fetch attempt.
#[derive(Debug)]
pub enum AttemptOutcome<T> {
    /// Usable payload
    Ok(T),
    /// Data definitively absent (no retry)
    Absent,
    /// Transient failure worth retrying
    Transient(String),
}

/// Classify an HTTP status for the retry loop.
///
/// 2xx never reaches this function. 403/404 mean the symbol or endpoint
/// has no data for us; retrying cannot change that. Rate limits and
/// server-side errors are transient. Everything else is treated as
/// absence.
pub fn classify_status<T>(status: StatusCode) -> AttemptOutcome<T> {
    match status.as_u16() {
        403 | 404 => AttemptOutcome::Absent,
        429 | 500 | 502 | 503 | 504 => {
            AttemptOutcome::Transient(format!("status {}", status.as_u16()))
        }
        _ => AttemptOutcome::Absent,
    }
}

/// Jittered exponential backoff delay for a zero-based attempt index.
///
/// Base doubles per attempt, multiplied by a uniform factor in
/// [0.75, 1.25], capped at `max_ms`.
pub fn backoff_delay(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    let exp = base_ms.saturating_mul(1u64 << attempt.min(16));
    let jitter = rand::thread_rng().gen_range(0.75..=1.25);
    let ms = ((exp as f64) * jitter).round() as u64;
    Duration::from_millis(ms.min(max_ms))
}

/// Run `attempt` up to `max_attempts` times, sleeping a jittered backoff
/// between transient failures. Exhaustion degrades to `None`.
pub async fn fetch_with_retry<T, F, Fut>(
    max_attempts: u32,
    base_delay_ms: u64,
    max_delay_ms: u64,
    mut attempt: F,
) -> Option<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = AttemptOutcome<T>>,
{
    let attempts = max_attempts.max(1);
    for i in 0..attempts {
        match attempt(i).await {
            AttemptOutcome::Ok(value) => return Some(value),
            AttemptOutcome::Absent => return None,
            AttemptOutcome::Transient(cause) => {
                if i + 1 == attempts {
                    warn!(attempts, cause = %cause, "Giving up after retries");
                    return None;
                }
                let delay = backoff_delay(i, base_delay_ms, max_delay_ms);
                debug!(attempt = i + 1, delay_ms = delay.as_millis() as u64, cause = %cause, "Retrying after transient failure");
                tokio::time::sleep(delay).await;
            }
        }
    }
    None
}

/// Shared HTTP client with a fixed timeout and retry budget.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    config: HttpConfig,
}

impl HttpClient {
    pub fn new(config: HttpConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("equity-screener/0.3")
            .build()
            .unwrap_or_default();

        Self { client, config }
    }

    /// GET a JSON document. Transient failures are retried within the
    /// configured budget; every other failure mode yields `None`.
    pub async fn get_json(
        &self,
        url: &str,
        headers: &[(&str, String)],
        params: &[(&str, String)],
    ) -> Option<serde_json::Value> {
        fetch_with_retry(
            self.config.max_retries,
            self.config.base_delay_ms,
            self.config.max_delay_ms,
            |_| async move {
                let mut request = self.client.get(url).query(params);
                for (name, value) in headers {
                    request = request.header(*name, value);
                }

                let response = match request.send().await {
                    Ok(r) => r,
                    Err(e) if e.is_timeout() || e.is_connect() => {
                        return AttemptOutcome::Transient(e.to_string());
                    }
                    Err(e) => {
                        warn!(url, error = %e, "Request failed");
                        return AttemptOutcome::Absent;
                    }
                };

                let status = response.status();
                if !status.is_success() {
                    let outcome = classify_status(status);
                    if matches!(outcome, AttemptOutcome::Absent) {
                        debug!(url, status = status.as_u16(), "No data for request");
                    }
                    return outcome;
                }

                match response.json::<serde_json::Value>().await {
                    Ok(json) => AttemptOutcome::Ok(json),
                    Err(e) => {
                        warn!(url, error = %e, "Failed to decode JSON body");
                        AttemptOutcome::Absent
                    }
                }
            },
        )
        .await
    }
}
