//! Exponential backoff with jitter, returning the outcome as a value.

use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Delay before the first retry; doubles for each later retry
    pub base_delay: Duration,
    /// Upper bound of the uniform random jitter added to each delay
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(1000),
            max_jitter: Duration::from_millis(1000),
        }
    }
}

/// Result of running an operation under a [`RetryPolicy`]
#[derive(Debug, Clone, PartialEq)]
pub enum RetryOutcome<T, E> {
    Success(T),
    /// Every attempt failed; carries the error of the final attempt
    Exhausted { last_error: E, attempts: u32 },
    /// The policy allowed no attempts at all
    NotAttempted,
}

impl<T, E> RetryOutcome<T, E> {
    pub fn is_success(&self) -> bool {
        matches!(self, RetryOutcome::Success(_))
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-indexed): `base * 2^retry + jitter`.
    pub fn delay_for(&self, retry: u32, jitter: Duration) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).saturating_add(jitter)
    }

    fn jitter(&self) -> Duration {
        let max = self.max_jitter.as_millis() as u64;
        if max == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max))
    }

    /// Run `op` until it succeeds or the attempts run out.
    ///
    /// `op` receives the 0-indexed attempt number. Every error is retried;
    /// there is no wait after the final attempt.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> RetryOutcome<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut last_error = None;

        for attempt in 0..self.max_attempts {
            match op(attempt).await {
                Ok(value) => return RetryOutcome::Success(value),
                Err(e) => {
                    if attempt + 1 < self.max_attempts {
                        let delay = self.delay_for(attempt, self.jitter());
                        warn!(
                            attempt = attempt + 1,
                            max_attempts = self.max_attempts,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "model call failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    } else {
                        warn!(attempts = self.max_attempts, error = %e, "model call failed, giving up");
                    }
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(last_error) => RetryOutcome::Exhausted {
                last_error,
                attempts: self.max_attempts,
            },
            None => RetryOutcome::NotAttempted,
        }
    }
}
