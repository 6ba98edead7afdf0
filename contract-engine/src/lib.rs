//! Contract Engine: usage limits and entitlements for SaaS pricing catalogs
//!
//! A Rust library that binds customer contracts to immutable pricing
//! versions and answers the two questions a SaaS backend asks on every
//! request: *may this user use this feature?* and *may this user consume
//! this much more?*
//!
//! # What is Contract Engine?
//!
//! - **Entitlement Evaluation**: plan defaults, add-on overrides and
//!   quantity-scaled limit extensions resolved into one entitlement set
//! - **Usage Tracking**: renewable and non-renewable limits with lazy,
//!   drift-free renewal
//! - **Novation**: plan, add-on, pricing-version and billing changes with
//!   consumption carried over
//! - **Entitlement Cache**: bounded LRU keyed by selection fingerprint, at
//!   most one computation per key across concurrent callers
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                ContractManager                   │
//! │  lock ─► read ─► resolve ─► transition ─► commit │
//! └──────┬─────────────┬───────────────┬─────────────┘
//!        │             │               │
//! ┌──────▼──────┐ ┌────▼──────────┐ ┌──▼──────────────┐
//! │ContractStore│ │EntitlementCache│ │ usage/novation │
//! │ (revision   │ │ (single-flight │ │ (pure state    │
//! │  checked)   │ │  LRU)          │ │  transitions)  │
//! └─────────────┘ └────┬──────────┘ └─────────────────┘
//!                      │ miss
//!               ┌──────▼───────┐
//!               │  evaluate()  │◄── PricingCatalog
//!               └──────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use contract_engine::{
//!     catalog::{InMemoryCatalog, PricingVersionRef},
//!     config::EngineConfig,
//!     contract::{ContactInfo, CreateContractParams, InMemoryContractStore, NovationRequest, UserId},
//!     manager::ContractManager,
//! };
//! use rust_decimal::Decimal;
//!
//! # async fn example() -> contract_engine::Result<()> {
//! let catalog = InMemoryCatalog::new();
//! catalog.publish_json(
//!     r#"{
//!     "service": "petclinic", "version": "2024", "currency": "EUR",
//!     "created_at": "2024-01-01T00:00:00Z",
//!     "usage_limits": {
//!         "seats": {
//!             "value_type": "numeric",
//!             "default_value": {"type": "numeric", "value": 1},
//!             "kind": "NON_RENEWABLE"
//!         }
//!     },
//!     "plans": {
//!         "basic": { "usage_limits": { "seats": {"type": "numeric", "value": 5} } },
//!         "pro": { "usage_limits": { "seats": {"type": "numeric", "value": 20} } }
//!     }
//! }"#,
//! )?;
//!
//! let manager = ContractManager::new(InMemoryContractStore::new(), catalog, &EngineConfig::default())?;
//! let user = UserId::new("user-1")?;
//! let pricing = PricingVersionRef::new("petclinic", "2024");
//! manager
//!     .create_contract(CreateContractParams::new(user.clone(), ContactInfo::new("alice"), pricing, "basic"))
//!     .await?;
//!
//! manager.increment_usage(&user, "seats", Decimal::from(5)).await?;
//! assert!(manager.increment_usage(&user, "seats", Decimal::ONE).await.is_err());
//!
//! manager.novate(&user, NovationRequest::plan("pro")).await?;
//! let seats = manager.increment_usage(&user, "seats", Decimal::ONE).await?;
//! assert_eq!(seats.consumed, Decimal::from(6));
//! # Ok(())
//! # }
//! ```
//!
//! # Module Organization
//!
//! - [`catalog`]: pricing versions, plans, add-ons, limits and the catalog collaborator
//! - [`contract`]: contracts, storage, usage tracking and novation transitions
//! - [`entitlements`]: evaluator, fingerprints and the entitlement cache
//! - [`manager`]: the contract lifecycle façade
//! - [`events`]: pricing-change notifications
//! - [`config`]: TOML configuration
//! - [`clock`]: injectable time source
//! - [`error`]: error taxonomy with stable codes
//! - [`reliability`]: retry with exponential backoff
//! - [`security`]: audit logging
//!
//! # Error Handling
//!
//! All operations return [`Result<T, EngineError>`](error::Result). Callers
//! that need a transport-independent identifier use [`EngineError::code`];
//! transient errors report [`EngineError::is_retryable`].
//!
//! ```rust
//! use contract_engine::{EngineError, error::ErrorCode};
//!
//! fn describe(err: &EngineError) -> &'static str {
//!     match err {
//!         EngineError::LimitExceeded { .. } => "upgrade your plan",
//!         EngineError::InvalidAddOnSelection(_) | EngineError::InvalidQuantity(_) => {
//!             "adjust the selection"
//!         }
//!         e if e.is_retryable() => "try again",
//!         e if e.code() == ErrorCode::NotFound => "no such contract",
//!         _ => "internal error",
//!     }
//! }
//! # let _ = describe;
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod catalog;
pub mod clock;
pub mod config;
pub mod contract;
pub mod entitlements;
pub mod error;
pub mod events;
pub mod manager;
pub mod reliability;
pub mod security;

pub use error::{EngineError, Result};
pub use manager::ContractManager;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let _ = std::marker::PhantomData::<EngineError>;
        let _ = std::marker::PhantomData::<
            ContractManager<contract::InMemoryContractStore, catalog::InMemoryCatalog>,
        >;
    }
}
