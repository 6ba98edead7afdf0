//! Entitlement resolution.
//!
//! [`evaluate`] turns a (pricing version, plan, add-ons) selection into an
//! immutable [`EntitlementSet`]; [`EntitlementCache`] memoizes it by
//! [`Fingerprint`] with single-flight computation.

mod cache;
mod evaluator;
mod fingerprint;
mod set;

pub use cache::{CacheStats, EntitlementCache};
pub use evaluator::{evaluate, validate_selection};
pub use fingerprint::Fingerprint;
pub use set::{EntitlementSet, FeatureEvaluation, ResolvedLimit};
