//! Retry policy with exponential backoff, jitter and `Retry-After` support.
//!
//! Each attempt's outcome goes through [`RetryPolicy::decide`], a pure function
//! that says whether to sleep and try again or hand the outcome back. The
//! async loop in [`execute_with_retry`] only sleeps and counts.

use std::{future::Future, time::Duration};

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use tracing::warn;

use crate::mcp::{
    error::BambooHrError,
    http::{config::ClientConfig, transport::RawResponse},
};

/// Case-insensitive fragments marking a network failure as transient.
const RETRYABLE_NETWORK_PATTERNS: &[&str] = &[
    "fetch is not defined",
    "network error",
    "timeout",
    "connection",
    "econnreset",
    "enotfound",
    "econnrefused",
    "etimedout",
    "socket hang up",
];

pub fn is_retryable_network_message(message: &str) -> bool {
    let message = message.to_lowercase();
    RETRYABLE_NETWORK_PATTERNS
        .iter()
        .any(|pattern| message.contains(pattern))
}

/// What to do with the outcome of one attempt.
#[derive(Debug)]
pub enum RetryDecision {
    /// Sleep for `delay` and try again.
    Retry { delay: Duration, reason: String },
    /// Hand this response to the caller, successful or not.
    Respond(RawResponse),
    /// Give up with this error.
    Fail(BambooHrError),
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts is one more.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub const fn from_config(config: &ClientConfig) -> Self {
        Self {
            max_attempts: config.max_retry_attempts,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            max_delay: Duration::from_millis(config.retry_max_delay_ms),
        }
    }

    /// Classifies the outcome of attempt `attempt` (0-based).
    pub fn decide(
        &self,
        attempt: u32,
        outcome: Result<RawResponse, BambooHrError>,
        now: DateTime<Utc>,
    ) -> RetryDecision {
        let last_attempt = attempt >= self.max_attempts;
        match outcome {
            Ok(response) if last_attempt => RetryDecision::Respond(response),
            Err(err) if last_attempt => RetryDecision::Fail(err),
            Ok(response) if response.status == StatusCode::TOO_MANY_REQUESTS => {
                RetryDecision::Retry {
                    delay: self.retry_after_delay(response.header("retry-after"), now),
                    reason: "rate limited (429)".to_string(),
                }
            }
            Ok(response) if response.status.is_server_error() => RetryDecision::Retry {
                delay: self.backoff_delay(attempt),
                reason: format!("server error ({})", response.status.as_u16()),
            },
            Ok(response) => RetryDecision::Respond(response),
            Err(err @ (BambooHrError::Timeout { .. } | BambooHrError::Network(_)))
                if err.is_retryable() =>
            {
                RetryDecision::Retry {
                    delay: self.backoff_delay(attempt),
                    reason: err.to_string(),
                }
            }
            Err(err) => RetryDecision::Fail(err),
        }
    }

    /// Exponential delay for attempt `attempt` with ±12.5% random jitter.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_delay_with(attempt, rand::random::<f64>())
    }

    /// `unit` is a sample from `[0, 1)`; 0.5 yields the plain exponential value.
    fn backoff_delay_with(&self, attempt: u32, unit: f64) -> Duration {
        let exponential = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        let factor = 0.25f64.mul_add(unit - 0.5, 1.0);
        Duration::try_from_secs_f64(exponential.as_secs_f64() * factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Delay requested by a `Retry-After` header, either delta-seconds or an
    /// HTTP date. Missing or unreadable headers fall back to twice the base
    /// delay. Always clamped to the maximum delay.
    pub fn retry_after_delay(&self, header: Option<&str>, now: DateTime<Utc>) -> Duration {
        let fallback = || self.base_delay.saturating_mul(2);
        let delay = header.map(str::trim).map_or_else(fallback, |value| {
            leading_seconds(value)
                .map(Duration::from_secs)
                .or_else(|| http_date_delay(value, now))
                .unwrap_or_else(fallback)
        });
        delay.min(self.max_delay)
    }
}

/// Whole seconds at the start of a `Retry-After` value: `"2.5"` is 2 and
/// negative values are 0. `None` when the value does not start with a number.
fn leading_seconds(value: &str) -> Option<u64> {
    let unsigned = value.strip_prefix(['-', '+']).unwrap_or(value);
    let digits = unsigned
        .split(|c: char| !c.is_ascii_digit())
        .next()
        .filter(|d| !d.is_empty())?;
    if value.starts_with('-') {
        return Some(0);
    }
    Some(digits.parse().unwrap_or(u64::MAX))
}

/// Time until an RFC 2822 date such as `Wed, 21 Oct 2015 07:28:00 GMT`;
/// dates in the past give zero.
fn http_date_delay(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let date = DateTime::parse_from_rfc2822(value).ok()?;
    let millis = (date.with_timezone(&Utc) - now).num_milliseconds();
    Some(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
}

/// Runs `send` until it yields a terminal outcome, sleeping between retries.
///
/// Non-retryable statuses are returned on the first attempt; retryable ones
/// are returned as-is once the retry budget is spent, and the last transport
/// error is returned likewise. Transport errors have `secret` scrubbed before
/// they are logged or returned.
///
/// # Errors
/// The last transport error, or the first one that is not retryable.
pub async fn execute_with_retry<F, Fut>(
    policy: &RetryPolicy,
    endpoint: &str,
    secret: &str,
    mut send: F,
) -> Result<RawResponse, BambooHrError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<RawResponse, BambooHrError>>,
{
    let mut attempt = 0u32;
    loop {
        let outcome = send().await.map_err(|err| err.redacted(secret));
        match policy.decide(attempt, outcome, Utc::now()) {
            RetryDecision::Retry { delay, reason } => {
                warn!(
                    endpoint,
                    attempt = attempt + 1,
                    max_attempts = policy.max_attempts + 1,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    %reason,
                    "BambooHR request failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            RetryDecision::Respond(response) => return Ok(response),
            RetryDecision::Fail(err) => return Err(err),
        }
    }
}
