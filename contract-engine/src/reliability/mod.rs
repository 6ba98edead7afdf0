//! Reliability patterns for contract mutations.
//!
//! Provides retry with exponential backoff for optimistic-concurrency
//! conflicts and entitlement computation timeouts.

mod retry;

pub use retry::{RetryPolicy, is_retryable, retry_with_backoff};
