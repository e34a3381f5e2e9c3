//! Bounded exponential-backoff retry
//!
//! The policy is a plain value passed to call sites. Instead of raising, row
//! fetches come back as a tagged [`FetchOutcome`] so the orchestrator can
//! tell a benign empty result from an exhausted retry without inspecting
//! error types. All errors are treated as retryable uniformly.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::AppError;
use crate::sync::clock::Clock;

/// Retry configuration: attempt count and backoff shape
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub backoff_factor: f64,
}

/// Result of a row fetch run under the retry policy
#[derive(Debug)]
pub enum FetchOutcome<T> {
    /// The call succeeded with a non-empty row set
    Rows(T),
    /// The call succeeded but the provider had nothing for this request
    Empty,
    /// Every attempt failed; the last cause is carried for logging
    Failed(AppError),
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration, backoff_factor: f64) -> Self {
        Self {
            max_attempts,
            initial_delay,
            backoff_factor,
        }
    }

    /// Run `op` until it succeeds or `max_attempts` is exhausted
    pub async fn run<T, F, Fut>(&self, clock: &dyn Clock, mut op: F) -> Result<T, AppError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let mut delay = self.initial_delay;
        let mut last_error = None;

        for attempt in 1..=self.max_attempts.max(1) {
            if attempt > 1 {
                clock.sleep(delay).await;
                delay = delay.mul_f64(self.backoff_factor);
            }

            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!(
                        "Attempt {}/{} failed: {}",
                        attempt,
                        self.max_attempts.max(1),
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| AppError::Internal("retry loop exited without an error".into())))
    }

    /// Run a row-producing `op` and fold the result into a [`FetchOutcome`]
    pub async fn fetch_rows<R, F, Fut>(&self, clock: &dyn Clock, op: F) -> FetchOutcome<Vec<R>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Vec<R>, AppError>>,
    {
        match self.run(clock, op).await {
            Ok(rows) if rows.is_empty() => FetchOutcome::Empty,
            Ok(rows) => FetchOutcome::Rows(rows),
            Err(e) => FetchOutcome::Failed(e),
        }
    }
}
