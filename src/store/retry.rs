//! Bounded retry with fixed or exponential delay, shared by every store call.

use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::RetrySettings;
use crate::error::StoreError;

/// Retry policy applied uniformly to store operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    exponential: bool,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, exponential: bool) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            exponential,
        }
    }

    /// Single attempt, no delay.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO, false)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if self.exponential {
            let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
            self.base_delay.saturating_mul(factor)
        } else {
            self.base_delay
        }
    }

    /// Runs `op` until it succeeds or the attempts are used up.
    ///
    /// The last error is returned on exhaustion.
    pub async fn execute<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(operation, attempt, "Store call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if attempt >= self.max_attempts => {
                    warn!(operation, attempts = attempt, error = %err, "Store retry limit exhausted");
                    return Err(err);
                }
                Err(err) => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Store call failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl From<RetrySettings> for RetryPolicy {
    fn from(settings: RetrySettings) -> Self {
        Self::new(
            settings.retry_count,
            Duration::from_millis(settings.retry_delay_ms),
            settings.exponential,
        )
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetrySettings::default().into()
    }
}
