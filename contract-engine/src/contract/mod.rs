//! Contracts: data model, storage, usage tracking and novation.

mod locks;
mod models;
mod novation;
mod store;
mod usage;

pub(crate) use locks::ContractLocks;
pub use models::{
    BillingPeriod, ContactInfo, Contract, ContractFilter, ContractPage, ContractRevision,
    CreateContractParams, MAX_PAGE_SIZE, UsageLevel, UserId,
};
pub use novation::{
    BillingPeriodExpiry, BillingPeriodUpdate, NovationRequest, PruneRule, apply_billing_period,
    apply_selection, initial_levels, rebase_levels,
};
pub use store::{ContractStore, InMemoryContractStore};
pub use usage::{UsageSnapshot, UsageTracker, cadence, reset_levels};
