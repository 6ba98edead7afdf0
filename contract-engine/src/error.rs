//! Error types for the contract engine.
//!
//! Every fallible operation in this crate returns [`Result<T>`], whose error
//! type is the closed [`EngineError`] taxonomy. All errors implement the
//! standard [`std::error::Error`] trait via [`thiserror::Error`].
//!
//! # Error Categories
//!
//! - **Lookup errors** ([`EngineError::NotFound`], [`EngineError::LimitNotFound`]):
//!   a contract, pricing version, plan or usage limit does not exist
//! - **Selection errors** ([`EngineError::InvalidAddOnSelection`],
//!   [`EngineError::InvalidQuantity`]): plan/add-on combination rejected before
//!   any state is touched
//! - **Usage errors** ([`EngineError::LimitExceeded`], [`EngineError::InvalidDelta`]):
//!   consumption would overflow a ceiling or the delta is malformed
//! - **Transient errors** ([`EngineError::ConcurrentModification`],
//!   [`EngineError::ComputationTimeout`]): safe to retry with backoff
//! - **Boundary errors** ([`EngineError::ValidationError`],
//!   [`EngineError::InvalidCatalog`], [`EngineError::ConfigError`])
//!
//! # Examples
//!
//! ```
//! use contract_engine::error::{EngineError, ErrorCode, Result};
//!
//! fn require_positive(delta: i64) -> Result<i64> {
//!     if delta < 0 {
//!         return Err(EngineError::InvalidDelta("delta must not be negative".to_owned()));
//!     }
//!     Ok(delta)
//! }
//!
//! let err = require_positive(-1).unwrap_err();
//! assert_eq!(err.code(), ErrorCode::InvalidDelta);
//! assert!(!err.is_retryable());
//! ```

use std::{fmt, time::Duration};

use thiserror::Error;

/// Result type alias for engine operations.
///
/// All fallible functions in this crate return this type.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Kind of resource a [`EngineError::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// A customer contract.
    Contract,
    /// A published pricing version.
    PricingVersion,
    /// A plan inside a pricing version.
    Plan,
    /// A feature inside a pricing version.
    Feature,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Contract => "contract",
            Self::PricingVersion => "pricing version",
            Self::Plan => "plan",
            Self::Feature => "feature",
        };
        f.write_str(name)
    }
}

/// Errors that can occur in the contract engine.
///
/// The variants form the stable taxonomy exposed to callers; use
/// [`EngineError::code`] for a transport-independent identifier.
///
/// # Error Recovery
///
/// - **Transient errors** ([`ConcurrentModification`](Self::ConcurrentModification),
///   [`ComputationTimeout`](Self::ComputationTimeout)): retry with exponential
///   backoff; the manager already does this a bounded number of times
/// - **Validation errors**: fix the input and resubmit
/// - **Usage errors**: surface to the end user; no state was changed
///
/// This type is `Clone` because a single entitlement computation result is
/// delivered to every caller waiting on the same fingerprint.
#[must_use = "errors should be handled, propagated, or explicitly panicked"]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    /// A contract, pricing version, plan or feature does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// What kind of resource was looked up.
        kind: ResourceKind,
        /// Identifier that failed to resolve.
        id: String,
    },

    /// The add-on selection violates availability, `depends_on` or
    /// `excludes` constraints, or names an unknown add-on.
    ///
    /// # Recovery
    ///
    /// Adjust the selection. No contract state was modified.
    #[error("Invalid add-on selection: {0}")]
    InvalidAddOnSelection(String),

    /// A purchased add-on quantity violates its subscription constraints.
    #[error("Invalid add-on quantity: {0}")]
    InvalidQuantity(String),

    /// Applying the delta would take consumption past the effective ceiling.
    ///
    /// The usage level is left untouched.
    #[error(
        "Usage limit '{limit}' exceeded: consumed {consumed} + requested {requested} > ceiling \
         {ceiling}"
    )]
    LimitExceeded {
        /// Usage limit name.
        limit: String,
        /// Consumption before the rejected increment.
        consumed: String,
        /// Requested delta.
        requested: String,
        /// Effective ceiling.
        ceiling: String,
    },

    /// The referenced usage limit is absent from the resolved entitlement set.
    #[error("Usage limit not found in entitlements: {0}")]
    LimitNotFound(String),

    /// The usage delta is malformed (negative on a monotonic counter, or not
    /// 0/1 on a boolean limit).
    #[error("Invalid usage delta: {0}")]
    InvalidDelta(String),

    /// The contract changed between read and write (optimistic revision
    /// mismatch). Retryable.
    #[error("Concurrent modification of contract {user_id}: expected revision {expected}")]
    ConcurrentModification {
        /// Contract owner.
        user_id: String,
        /// Revision the writer expected to replace.
        expected: u64,
    },

    /// An entitlement computation did not finish within the configured
    /// bound. Retryable.
    #[error("Entitlement computation timed out after {0:?}")]
    ComputationTimeout(Duration),

    /// Malformed input at the engine boundary.
    #[error("Validation failed: {0}")]
    ValidationError(String),

    /// A pricing version failed catalog boundary validation.
    #[error("Invalid pricing catalog: {0}")]
    InvalidCatalog(String),

    /// Engine configuration is invalid or could not be parsed.
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Internal invariant failure (poisoned lock, aborted computation).
    #[error("Internal engine error: {0}")]
    Internal(String),
}

/// Stable, transport-independent error identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// See [`EngineError::NotFound`].
    NotFound,
    /// See [`EngineError::InvalidAddOnSelection`].
    InvalidAddOnSelection,
    /// See [`EngineError::InvalidQuantity`].
    InvalidQuantity,
    /// See [`EngineError::LimitExceeded`].
    LimitExceeded,
    /// See [`EngineError::LimitNotFound`].
    LimitNotFound,
    /// See [`EngineError::InvalidDelta`].
    InvalidDelta,
    /// See [`EngineError::ConcurrentModification`].
    ConcurrentModification,
    /// See [`EngineError::ComputationTimeout`].
    ComputationTimeout,
    /// Boundary validation, catalog and configuration failures.
    ValidationError,
    /// See [`EngineError::Internal`].
    Internal,
}

impl ErrorCode {
    /// Returns the wire representation of the code.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::InvalidAddOnSelection => "INVALID_ADD_ON_SELECTION",
            Self::InvalidQuantity => "INVALID_QUANTITY",
            Self::LimitExceeded => "LIMIT_EXCEEDED",
            Self::LimitNotFound => "LIMIT_NOT_FOUND",
            Self::InvalidDelta => "INVALID_DELTA",
            Self::ConcurrentModification => "CONCURRENT_MODIFICATION",
            Self::ComputationTimeout => "COMPUTATION_TIMEOUT",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::Internal => "INTERNAL",
        }
    }
}

impl EngineError {
    /// Shorthand for a missing contract.
    pub fn contract_not_found(user_id: impl Into<String>) -> Self {
        Self::NotFound { kind: ResourceKind::Contract, id: user_id.into() }
    }

    /// Returns the stable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::InvalidAddOnSelection(_) => ErrorCode::InvalidAddOnSelection,
            Self::InvalidQuantity(_) => ErrorCode::InvalidQuantity,
            Self::LimitExceeded { .. } => ErrorCode::LimitExceeded,
            Self::LimitNotFound(_) => ErrorCode::LimitNotFound,
            Self::InvalidDelta(_) => ErrorCode::InvalidDelta,
            Self::ConcurrentModification { .. } => ErrorCode::ConcurrentModification,
            Self::ComputationTimeout(_) => ErrorCode::ComputationTimeout,
            Self::ValidationError(_) | Self::InvalidCatalog(_) | Self::ConfigError(_) => {
                ErrorCode::ValidationError
            }
            Self::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Returns `true` for transient errors that may succeed on retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification { .. } | Self::ComputationTimeout(_))
    }
}
