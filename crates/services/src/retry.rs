use std::future::Future;
use std::time::Duration;

use log::warn;
use rand::Rng;
use storage::repository::StorageError;

use crate::error::ReviewServiceError;

/// Bounds on how hard a store operation is retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total tries, including the first.
    pub max_attempts: u32,
    /// Sleep before the second try; doubled for every further try.
    pub base_backoff: Duration,
    /// Deadline for a single store call.
    pub op_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(20),
            op_timeout: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// # Errors
    ///
    /// Returns a message when the policy would never attempt anything or
    /// would time out every call immediately.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1".into());
        }
        if self.op_timeout.is_zero() {
            return Err("op_timeout must be positive".into());
        }
        Ok(())
    }

    /// Delay after the given failed attempt (1-based), with up to 50% jitter.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = self
            .base_backoff
            .saturating_mul(1_u32 << attempt.saturating_sub(1).min(16));
        let jitter_cap = u64::try_from(exp.as_millis() / 2).unwrap_or(u64::MAX);
        let jitter = if jitter_cap == 0 {
            0
        } else {
            rand::rng().random_range(0..=jitter_cap)
        };
        exp.saturating_add(Duration::from_millis(jitter))
    }

    /// Run one store call under the per-operation deadline.
    pub(crate) async fn guard<T, F>(&self, call: F) -> Result<T, Attempt>
    where
        F: Future<Output = Result<T, StorageError>>,
    {
        match tokio::time::timeout(self.op_timeout, call).await {
            Ok(result) => result.map_err(Attempt::Storage),
            Err(_) => Err(Attempt::Retry(format!(
                "store call exceeded {}ms",
                self.op_timeout.as_millis()
            ))),
        }
    }

    /// Drive `op` until it succeeds, fails for good, or runs out of attempts.
    pub(crate) async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, ReviewServiceError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, Attempt>>,
    {
        let mut last_reason = String::from("no attempts made");
        for attempt in 1..=self.max_attempts {
            let reason = match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(Attempt::Fail(e)) => return Err(e),
                Err(Attempt::Storage(StorageError::Conflict)) => "write conflict".to_string(),
                Err(Attempt::Storage(StorageError::Connection(msg))) => msg,
                Err(Attempt::Storage(other)) => {
                    return Err(ReviewServiceError::Unavailable(other.to_string()));
                }
                Err(Attempt::Retry(reason)) => reason,
            };
            warn!(
                "{label}: attempt {attempt}/{} failed: {reason}",
                self.max_attempts
            );
            last_reason = reason;
            if attempt < self.max_attempts {
                tokio::time::sleep(self.backoff(attempt)).await;
            }
        }
        Err(ReviewServiceError::Unavailable(format!(
            "{label}: gave up after {} attempts ({last_reason})",
            self.max_attempts
        )))
    }
}

/// Outcome of a single try inside [`RetryPolicy::run`].
#[derive(Debug)]
pub(crate) enum Attempt {
    /// Transient failure (timeout); try again.
    Retry(String),
    /// Raw storage failure; conflicts and connection errors are retried.
    Storage(StorageError),
    /// Permanent failure; surface as-is.
    Fail(ReviewServiceError),
}
