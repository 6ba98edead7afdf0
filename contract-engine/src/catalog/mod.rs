//! Pricing catalog: data model, boundary validation and the read-only
//! collaborator the engine resolves pricing versions through.

mod models;
mod store;

pub use models::{
    AddOn, Feature, LimitKind, PeriodUnit, Plan, PricingVersion, PricingVersionRef, Quantity,
    RenewalPeriod, SubscriptionConstraints, UsageLimit, Value, ValueType,
};
pub use store::{InMemoryCatalog, PricingCatalog, VersionStatus};
