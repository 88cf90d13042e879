//! Retry-with-backoff for fetch operations.
//!
//! Every attempt races the producer against a per-attempt timeout. A failed
//! attempt waits `retry_delay * 2^attempt` before the next one. There is no
//! deadline across attempts, so the worst case wall time is
//! `timeout * (retry_count + 1)` plus the sum of the backoff delays.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{Error, Result};

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchOptions {
    /// Retries after the first attempt. `0` means exactly one attempt.
    #[serde(alias = "retryCount")]
    pub retry_count: u32,
    /// Base backoff delay in milliseconds.
    #[serde(alias = "retryDelay")]
    pub retry_delay_ms: u64,
    /// Per-attempt timeout in milliseconds. `None` lets an attempt run unbounded.
    #[serde(alias = "timeout")]
    pub timeout_ms: Option<u64>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            retry_count: 3,
            retry_delay_ms: 1000,
            timeout_ms: Some(10_000),
        }
    }
}

impl FetchOptions {
    /// Options with the given retry settings and no per-attempt timeout.
    pub fn untimed(retry_count: u32, retry_delay_ms: u64) -> Self {
        Self {
            retry_count,
            retry_delay_ms,
            timeout_ms: None,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Backoff before the retry that follows `attempt` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        // Shifts of 64 or more saturate instead of wrapping.
        let multiplier = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        Duration::from_millis(self.retry_delay_ms.saturating_mul(multiplier))
    }
}

/// Run `producer` until it succeeds or the attempts are exhausted.
///
/// Returns the first successful value, or the error of the last attempt.
/// A timed-out attempt's future is dropped before the next one starts.
pub async fn fetch_with_retry<F, Fut, T>(mut producer: F, options: &FetchOptions) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0u32;

    loop {
        let outcome = match options.timeout_ms {
            Some(timeout_ms) => {
                match tokio::time::timeout(Duration::from_millis(timeout_ms), producer()).await {
                    Ok(result) => result,
                    Err(_) => Err(Error::Timeout { timeout_ms }),
                }
            }
            None => producer().await,
        };

        match outcome {
            Ok(value) => {
                if attempt > 0 {
                    debug!(attempt = attempt + 1, "Fetch succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if attempt >= options.retry_count => {
                debug!(
                    attempts = attempt + 1,
                    error = %err,
                    "Fetch failed, retries exhausted"
                );
                return Err(err);
            }
            Err(err) => {
                let delay = options.delay_for_attempt(attempt);
                warn!(
                    attempt = attempt + 1,
                    max = options.retry_count,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Retrying fetch after error"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
