//! Generic retry over transient store failures.
//!
//! `with_retry` is the single retry primitive in the system: the transaction
//! executor wraps every unit of work in it, and plain reads go through it
//! directly. Only errors classified retryable by
//! [`StoreError::is_retryable`] are retried; everything else surfaces
//! immediately.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::errors::StoreError;

/// Retry budget and backoff shape for transient store failures.
///
/// A tunable, not a correctness contract: the unit of work must already be
/// safe to run any number of times.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the initial one.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on the backoff delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
        }
    }
}

/// Run `op` until it succeeds, fails terminally, or the retry budget is
/// exhausted, backing off exponentially between attempts.
///
/// `op` is re-invoked from scratch on every attempt and must be idempotent.
/// On exhaustion the last observed error is returned.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut delay = policy.initial_delay;
    let mut last_error: Option<StoreError> = None;

    for attempt in 0..=policy.max_retries {
        match op().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(attempt, "Operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if e.is_retryable() => {
                warn!(
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Transient store error, retrying"
                );
                last_error = Some(e);

                // Don't wait after the last attempt
                if attempt < policy.max_retries {
                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(delay * 2, policy.max_delay);
                }
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_error
        .unwrap_or_else(|| StoreError::query("retry budget exhausted with no recorded error")))
}
