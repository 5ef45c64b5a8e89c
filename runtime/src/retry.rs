//! Retry with exponential backoff for transient delivery failures.
//!
//! # Example
//!
//! ```rust
//! use bookings_runtime::retry::{RetryPolicy, retry_with_backoff};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), String> {
//! let policy = RetryPolicy::new()
//!     .with_max_retries(5)
//!     .with_initial_delay(Duration::from_millis(100))
//!     .with_max_delay(Duration::from_secs(10));
//!
//! let sent = retry_with_backoff(&policy, || async { Ok::<_, String>(42) }).await?;
//! assert_eq!(sent, 42);
//! # Ok(())
//! # }
//! ```

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Exponential backoff settings.
///
/// # Default Values
///
/// - `max_retries`: 3
/// - `initial_delay`: 100ms
/// - `max_delay`: 30 seconds
/// - `multiplier`: 2.0 (delay doubles each retry)
/// - `jitter`: 0.0 (no randomisation)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: usize,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Cap on any single delay.
    pub max_delay: Duration,
    /// Growth factor between retries.
    pub multiplier: f64,
    /// Fraction of each delay that is randomised, in `0.0..=1.0`.
    pub jitter: f64,
}

impl RetryPolicy {
    /// The default policy.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: 0.0,
        }
    }

    /// Never retry.
    #[must_use]
    pub const fn none() -> Self {
        Self::new().with_max_retries(0)
    }

    /// Set the number of retries.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the first delay.
    #[must_use]
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the delay cap.
    #[must_use]
    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the growth factor.
    #[must_use]
    pub const fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Randomise up to `jitter` of each delay. Clamped to `0.0..=1.0`.
    #[must_use]
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    /// Delay before retry number `attempt` (0-based), without jitter.
    ///
    /// `initial_delay * multiplier^attempt`, capped at `max_delay`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap, clippy::cast_precision_loss, clippy::cast_sign_loss)]
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return self.initial_delay.min(self.max_delay);
        }
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let delay_ms = self.initial_delay.as_millis() as f64 * self.multiplier.powi(exponent);
        if !delay_ms.is_finite() || delay_ms >= self.max_delay.as_millis() as f64 {
            return self.max_delay;
        }
        Duration::from_millis(delay_ms as u64)
    }

    /// Delay before retry number `attempt`, with jitter applied.
    ///
    /// The result stays within `[delay * (1 - jitter), delay]`.
    #[must_use]
    pub fn jittered_delay(&self, attempt: usize) -> Duration {
        let delay = self.delay_for_attempt(attempt);
        if self.jitter <= 0.0 {
            return delay;
        }
        let keep = 1.0 - rand::thread_rng().gen_range(0.0..=self.jitter);
        delay.mul_f64(keep)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// Retry `operation` until it succeeds or the policy is exhausted.
///
/// # Errors
///
/// The error from the final attempt.
pub async fn retry_with_backoff<F, Fut, T, E>(policy: &RetryPolicy, operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    retry_with_predicate(policy, operation, |_| true).await
}

/// Retry `operation` while `is_retryable` accepts its error.
///
/// # Errors
///
/// The first non-retryable error, or the error from the final attempt.
pub async fn retry_with_predicate<F, Fut, T, E, P>(
    policy: &RetryPolicy,
    mut operation: F,
    is_retryable: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(err) if !is_retryable(&err) => {
                tracing::warn!(error = %err, "Error is not retryable, failing immediately");
                return Err(err);
            }
            Err(err) if attempt >= policy.max_retries => {
                tracing::error!(attempt, error = %err, "Operation failed after max retries");
                return Err(err);
            }
            Err(err) => {
                let delay = policy.jittered_delay(attempt);
                tracing::warn!(attempt, delay = ?delay, error = %err, "Operation failed, retrying");
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting<E: Clone>(
        calls: &Arc<AtomicUsize>,
        fail_first: usize,
        error: E,
    ) -> impl FnMut() -> std::future::Ready<Result<usize, E>> {
        let calls = Arc::clone(calls);
        move || {
            let attempt = calls.fetch_add(1, Ordering::SeqCst);
            if attempt < fail_first {
                std::future::ready(Err(error.clone()))
            } else {
                std::future::ready(Ok(attempt))
            }
        }
    }

    #[test]
    fn delays_double_until_capped() {
        let policy = RetryPolicy::new()
            .with_initial_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_millis(500));

        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(200), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = RetryPolicy::new().with_max_retries(3);

        let result = retry_with_backoff(&policy, counting(&calls, 2, "busy".to_string())).await;

        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_with_the_last_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let policy = RetryPolicy::new().with_max_retries(2);

        let result: Result<(), String> = retry_with_backoff(&policy, || {
            let attempt = counter.fetch_add(1, Ordering::SeqCst);
            async move { Err(format!("attempt {attempt}")) }
        })
        .await;

        assert_eq!(result, Err("attempt 2".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let result = retry_with_predicate(
            &RetryPolicy::new(),
            counting(&calls, usize::MAX, "bad address".to_string()),
            |err: &String| !err.contains("address"),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn no_retry_policy_calls_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let result = retry_with_backoff(&RetryPolicy::none(), counting(&calls, 1, 7)).await;

        assert_eq!(result, Err(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    proptest! {
        #[test]
        fn jitter_stays_within_bounds(attempt in 0usize..10, jitter in 0.0f64..=1.0) {
            let policy = RetryPolicy::new().with_jitter(jitter);
            let base = policy.delay_for_attempt(attempt);
            let jittered = policy.jittered_delay(attempt);

            prop_assert!(jittered <= base);
            prop_assert!(jittered >= base.mul_f64(1.0 - jitter).saturating_sub(Duration::from_nanos(1)));
        }
    }
}
