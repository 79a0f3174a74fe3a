//! Retry logic for transient failures
//!
//! Terraform talks to provider registries and cloud APIs on every command, so
//! init/apply/destroy occasionally fail for reasons that have nothing to do
//! with the fixture. Those failures are retried at a fixed interval; anything
//! else is returned on first sight.

use crate::error::{EcsTestError, IsRetryable, Result};
use std::time::Duration;
use tracing::{info, warn};

/// Retry policy trait
pub trait RetryPolicy: Send + Sync {
    /// Execute a function with retry logic
    async fn execute_with_retry<F, Fut, T>(&self, f: F) -> Result<T>
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: std::future::Future<Output = Result<T>> + Send;
}

/// Fixed-interval retry policy
///
/// `max_retries` counts retries, not attempts: a policy with 3 retries calls
/// the operation at most 4 times.
#[derive(Debug, Clone)]
pub struct FixedIntervalPolicy {
    max_retries: u32,
    interval: Duration,
}

impl FixedIntervalPolicy {
    pub fn new(max_retries: u32, interval: Duration) -> Self {
        Self {
            max_retries,
            interval,
        }
    }

    /// Policy used for terraform commands (3 retries, 5 seconds apart)
    pub fn for_terraform() -> Self {
        Self::new(3, Duration::from_secs(5))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

impl RetryPolicy for FixedIntervalPolicy {
    async fn execute_with_retry<F, Fut, T>(&self, f: F) -> Result<T>
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: std::future::Future<Output = Result<T>> + Send,
    {
        let max_attempts = self.max_attempts();

        for attempt in 0..max_attempts {
            match f().await {
                Ok(result) => {
                    if attempt > 0 {
                        info!("Operation succeeded after {} retries", attempt);
                    }
                    return Ok(result);
                }
                Err(e) => {
                    if !e.is_retryable() {
                        return Err(e);
                    }

                    if attempt + 1 == max_attempts {
                        warn!("Max retries ({}) reached", self.max_retries);
                        return Err(EcsTestError::Retryable {
                            attempt: attempt + 1,
                            max_attempts,
                            reason: e.to_string(),
                            source: Some(Box::new(e)),
                        });
                    }

                    warn!(
                        "Retryable error (attempt {}/{}), retrying in {:?}: {}",
                        attempt + 1,
                        max_attempts,
                        self.interval,
                        e
                    );
                    tokio::time::sleep(self.interval).await;
                }
            }
        }

        // max_attempts is always >= 1, so the loop returns before this
        Err(EcsTestError::Retryable {
            attempt: max_attempts,
            max_attempts,
            reason: "no attempts made".to_string(),
            source: None,
        })
    }
}
