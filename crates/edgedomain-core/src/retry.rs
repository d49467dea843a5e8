//! Backoff retrier for provider calls
//!
//! Every remote call made by the core goes through [`BackoffRetrier::execute`].
//! Throttling errors are retried with Decorrelated Jitter: each wait is drawn
//! uniformly from `[0, previous_wait * 3)` and clamped to
//! `[min_wait, max_wait]`. Waiting stops once the accumulated wait reaches the
//! time budget, so a call never overruns the budget by more than one wait.
//! Any other error is returned immediately.
//!
//! Budget state lives in a [`RetryBudget`] created fresh for each `execute`
//! call; nothing is shared between calls.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::RetryPolicy;
use crate::error::ProviderError;

/// Smallest wait ever slept, so a zero `min_wait` cannot spin
const WAIT_FLOOR: Duration = Duration::from_millis(1);

/// Per-call retry state
#[derive(Debug, Clone, Default)]
pub struct RetryBudget {
    /// Total time spent waiting so far
    elapsed: Duration,
    /// The previous wait interval (zero before the first retry)
    previous_wait: Duration,
}

impl RetryBudget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time spent waiting so far
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Whether the budget leaves no room for another wait
    pub fn is_exhausted(&self, policy: &RetryPolicy) -> bool {
        self.elapsed >= policy.time_budget()
    }

    /// Draw the next wait and charge it to the budget
    pub fn next_wait(&mut self, policy: &RetryPolicy) -> Duration {
        let upper = self.previous_wait.as_secs_f64() * 3.0;
        let sampled = rand::thread_rng().r#gen::<f64>() * upper;

        let min = policy.min_wait().max(WAIT_FLOOR).as_secs_f64();
        let max = policy.max_wait().max(WAIT_FLOOR).as_secs_f64();
        let wait = Duration::from_secs_f64(sampled.max(min).min(max));

        self.previous_wait = wait;
        self.elapsed += wait;
        wait
    }
}

/// Wraps provider calls with jittered exponential backoff
#[derive(Debug, Clone)]
pub struct BackoffRetrier {
    policy: RetryPolicy,
}

impl BackoffRetrier {
    /// Create a retrier with the given timing policy
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// The timing policy in use
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `call` until it succeeds, fails fatally, or the budget runs out
    ///
    /// # Parameters
    ///
    /// - `operation`: Name used in log lines
    /// - `call`: Produces one attempt of the remote operation
    ///
    /// # Returns
    ///
    /// - `Ok(T)`: The first successful attempt
    /// - `Err(ProviderError)`: The first non-retryable error, or the most
    ///   recent throttling error once the budget is exhausted
    pub async fn execute<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut budget = RetryBudget::new();
        let mut attempt: u32 = 1;

        loop {
            let err = match call().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_retryable() {
                debug!("{} failed with non-retryable error: {}", operation, err);
                return Err(err);
            }

            if budget.is_exhausted(&self.policy) {
                warn!(
                    "{} still throttled after {} attempts ({:.0}s waited), giving up",
                    operation,
                    attempt,
                    budget.elapsed().as_secs_f64()
                );
                return Err(err);
            }

            let wait = budget.next_wait(&self.policy);
            warn!(
                "{} throttled (attempt {}): {}. Retrying in {:.1}s",
                operation,
                attempt,
                err,
                wait.as_secs_f64()
            );
            tokio::time::sleep(wait).await;
            attempt += 1;
        }
    }
}

impl Default for BackoffRetrier {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}
