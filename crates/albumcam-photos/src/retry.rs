//! Retry policy for Photos Library requests
//!
//! Transient failures (429, 5xx, network errors) are retried a fixed number
//! of times with a fixed delay. A 429 with a `Retry-After` header waits for
//! the server-provided duration instead, capped at one hour.

use std::time::Duration;

use tracing::warn;

/// Longest `Retry-After` we are willing to honour
const MAX_RETRY_AFTER: Duration = Duration::from_secs(3600);

/// How many times a request is attempted and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one (at least 1)
    pub max_attempts: u32,
    /// Wait between attempts when the server gives no hint
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// A policy that never retries
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Returns true if another attempt may follow attempt number `attempt` (1-based)
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(3))
    }
}

/// Parses a `Retry-After` header value
///
/// Accepts delta-seconds (`"120"`) or an HTTP-date. Falls back to `default`
/// when the value is unparseable, in the past, or longer than an hour.
pub fn parse_retry_after(value: &str, default: Duration) -> Duration {
    let value = value.trim();

    if let Ok(seconds) = value.parse::<u64>() {
        return Duration::from_secs(seconds).min(MAX_RETRY_AFTER);
    }

    if let Ok(date) = chrono::DateTime::parse_from_rfc2822(value) {
        let now = chrono::Utc::now();
        let target = date.with_timezone(&chrono::Utc);
        if let Ok(wait) = (target - now).to_std() {
            if wait <= MAX_RETRY_AFTER {
                return wait;
            }
        }
    }

    warn!(value, "Could not parse Retry-After header, using default");
    default
}
