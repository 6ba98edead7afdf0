//! Exponential backoff retry for transient engine failures.
//!
//! Contract mutations are committed with an optimistic revision check. When
//! two writers race, the loser gets [`EngineError::ConcurrentModification`]
//! and the whole read-modify-write attempt is replayed here. Only errors for
//! which [`EngineError::is_retryable`] holds are retried; everything else is
//! returned on the first failure.

use std::time::Duration;

use crate::error::{EngineError, Result};

/// Configuration for retry behavior.
///
/// The delay between attempts grows exponentially up to `max_delay`.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use contract_engine::reliability::RetryPolicy;
///
/// // Default policy: 3 attempts, 100ms initial delay, 5s max delay
/// let policy = RetryPolicy::default();
///
/// // Tighter policy for hot counters
/// let tight = RetryPolicy {
///     max_attempts: 5,
///     initial_delay: Duration::from_millis(5),
///     max_delay: Duration::from_millis(200),
///     backoff_multiplier: 2.0,
/// };
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first (default: 3)
    pub max_attempts: u32,
    /// Delay before the first retry (default: 100ms)
    pub initial_delay: Duration,
    /// Upper bound on any single delay (default: 5s)
    pub max_delay: Duration,
    /// Multiplier for exponential backoff (default: 2.0)
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with custom maximum attempts.
    ///
    /// # Examples
    ///
    /// ```
    /// use contract_engine::reliability::RetryPolicy;
    ///
    /// let policy = RetryPolicy::with_max_attempts(5);
    /// assert_eq!(policy.max_attempts, 5);
    /// ```
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self { max_attempts, ..Self::default() }
    }

    /// Delay before retry number `attempt + 1`.
    ///
    /// `initial_delay * multiplier ^ attempt`, capped at `max_delay`.
    pub(crate) fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        #[allow(clippy::cast_precision_loss, reason = "acceptable for duration calculations")]
        let delay_ms = self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(exponent);
        let max_ms = self.max_delay.as_millis();
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss,
            reason = "delay_ms is non-negative and clamped to max_delay before conversion"
        )]
        let delay = if !delay_ms.is_finite() || delay_ms >= max_ms as f64 {
            self.max_delay
        } else {
            Duration::from_millis(delay_ms as u64)
        };
        delay.min(self.max_delay)
    }
}

/// Executes `operation`, retrying retryable errors with exponential backoff.
///
/// The operation is attempted at most `max_attempts` times (at least once).
/// Non-retryable errors are returned immediately; when attempts run out the
/// last retryable error is returned.
///
/// # Examples
///
/// ```
/// use std::sync::{
///     Arc,
///     atomic::{AtomicU32, Ordering},
/// };
///
/// use contract_engine::{
///     error::EngineError,
///     reliability::{RetryPolicy, retry_with_backoff},
/// };
///
/// # async fn example() -> contract_engine::Result<()> {
/// let attempt = Arc::new(AtomicU32::new(0));
///
/// let revision = retry_with_backoff(&RetryPolicy::default(), || {
///     let attempt = Arc::clone(&attempt);
///     async move {
///         if attempt.fetch_add(1, Ordering::Relaxed) == 0 {
///             Err(EngineError::ConcurrentModification { user_id: "u1".to_owned(), expected: 1 })
///         } else {
///             Ok(2_u64)
///         }
///     }
/// })
/// .await?;
///
/// assert_eq!(revision, 2);
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns the first non-retryable error, or the last retryable error once
/// all attempts are exhausted.
pub async fn retry_with_backoff<F, Fut, T>(policy: &RetryPolicy, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!(attempt = attempt + 1, "Operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) if error.is_retryable() && attempt + 1 < max_attempts => {
                let delay = policy.delay_for_attempt(attempt);
                tracing::warn!(
                    attempt = attempt + 1,
                    max_attempts,
                    error = %error,
                    "Transient failure, retrying"
                );
                tracing::debug!(delay_ms = delay.as_millis(), "Sleeping before retry");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => {
                if error.is_retryable() {
                    tracing::warn!(attempts = attempt + 1, error = %error, "Retries exhausted");
                }
                return Err(error);
            }
        }
    }
}

/// Returns `true` if `error` is worth retrying.
///
/// Free-function form of [`EngineError::is_retryable`].
#[must_use]
pub const fn is_retryable(error: &EngineError) -> bool {
    error.is_retryable()
}
