//! Contract data model.
//!
//! A [`Contract`] binds one user to one pricing version, a plan and a set of
//! add-on quantities, and carries the per-limit consumption counters the
//! usage tracker maintains. Contracts are plain data; every transition lives
//! in [`usage`](super::usage) and [`novation`](super::novation).

use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    catalog::{PricingVersionRef, RenewalPeriod},
    entitlements::Fingerprint,
    error::{EngineError, Result},
};

/// Maximum contracts returned in one page.
pub const MAX_PAGE_SIZE: usize = 100;

/// Identifier of the user a contract belongs to.
///
/// One user holds at most one contract.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Creates a user ID after validation.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ValidationError`] if the ID is empty, exceeds 64
    /// characters, or contains characters other than ASCII alphanumerics,
    /// hyphens and underscores.
    pub fn new<S: Into<String>>(id: S) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(EngineError::ValidationError("user_id cannot be empty".into()));
        }
        if id.len() > 64 {
            return Err(EngineError::ValidationError(
                "user_id must be 64 characters or less".into(),
            ));
        }
        if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(EngineError::ValidationError(
                "user_id can only contain alphanumeric characters, hyphens, and underscores"
                    .into(),
            ));
        }
        Ok(Self(id))
    }

    /// Returns the inner string reference.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for UserId {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

/// Contact details of the contract holder. No entitlement impact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    /// Login name.
    pub username: String,
    /// Given name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Family name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Phone number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl ContactInfo {
    /// Contact with only a username.
    pub fn new(username: impl Into<String>) -> Self {
        Self { username: username.into(), ..Self::default() }
    }

    /// Sets the email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Validates the contact details.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ValidationError`] for an empty username or an
    /// email without an `@`.
    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(EngineError::ValidationError("username cannot be empty".into()));
        }
        if let Some(email) = &self.email
            && !email.contains('@')
        {
            return Err(EngineError::ValidationError(format!("invalid email address: {email}")));
        }
        Ok(())
    }
}

/// Billing cadence of a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingPeriod {
    /// Start of the first billing cycle.
    pub start: DateTime<Utc>,
    /// Length of one billing cycle; also the cadence of renewable limits
    /// that declare no period of their own.
    pub renewal: RenewalPeriod,
    /// Whether the contract renews after `end`.
    pub auto_renew: bool,
    /// End of the contract term, if fixed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
}

impl BillingPeriod {
    /// Auto-renewing period with no fixed end.
    #[must_use]
    pub const fn starting(start: DateTime<Utc>, renewal: RenewalPeriod) -> Self {
        Self { start, renewal, auto_renew: true, end: None }
    }
}

/// Consumption of one usage limit in its current cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageLevel {
    /// Amount consumed; boolean limits use 0 or 1.
    pub consumed: Decimal,
    /// Start of the cycle `consumed` belongs to.
    pub period_start: DateTime<Utc>,
    /// Start of the first cycle. Renewals count whole periods from here, so
    /// a month-end anchor survives clamping into shorter months.
    pub anchor: DateTime<Utc>,
}

impl UsageLevel {
    /// Zero consumption with cycles anchored at `now`.
    #[must_use]
    pub const fn fresh(now: DateTime<Utc>) -> Self {
        Self { consumed: Decimal::ZERO, period_start: now, anchor: now }
    }
}

/// Snapshot of a contract's selection before a novation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractRevision {
    /// Pricing version in force.
    pub pricing: PricingVersionRef,
    /// Plan in force.
    pub plan: String,
    /// Add-on quantities in force.
    pub add_ons: BTreeMap<String, u32>,
    /// Billing period in force.
    pub billing_period: BillingPeriod,
    /// When the selection was replaced.
    pub replaced_at: DateTime<Utc>,
}

/// A user's binding to a pricing version, plan and add-ons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    /// Owner.
    pub user_id: UserId,
    /// Contact details.
    pub contact: ContactInfo,
    /// Bound pricing version.
    pub pricing: PricingVersionRef,
    /// Selected plan.
    pub plan: String,
    /// Selected add-ons and purchased quantities.
    pub add_ons: BTreeMap<String, u32>,
    /// Billing cadence.
    pub billing_period: BillingPeriod,
    /// Consumption per trackable usage limit.
    pub usage_levels: BTreeMap<String, UsageLevel>,
    /// Earlier selections, oldest first.
    #[serde(default)]
    pub history: Vec<ContractRevision>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency token, bumped on every committed write.
    pub revision: u64,
}

impl Contract {
    /// Cache key of this contract's entitlement selection.
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::compute(&self.pricing, &self.plan, &self.add_ons)
    }

    /// Snapshot of the current selection, for history.
    #[must_use]
    pub fn snapshot(&self, replaced_at: DateTime<Utc>) -> ContractRevision {
        ContractRevision {
            pricing: self.pricing.clone(),
            plan: self.plan.clone(),
            add_ons: self.add_ons.clone(),
            billing_period: self.billing_period,
            replaced_at,
        }
    }
}

/// Input of [`ContractManager::create_contract`](crate::manager::ContractManager::create_contract).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateContractParams {
    /// Owner.
    pub user_id: UserId,
    /// Contact details.
    pub contact: ContactInfo,
    /// Pricing version to bind.
    pub pricing: PricingVersionRef,
    /// Plan to select.
    pub plan: String,
    /// Add-ons to select with quantities.
    pub add_ons: BTreeMap<String, u32>,
    /// Billing cycle length (default: one month).
    pub renewal: RenewalPeriod,
    /// Whether the contract renews automatically (default: true).
    pub auto_renew: bool,
    /// Fixed end of term.
    pub end: Option<DateTime<Utc>>,
}

impl CreateContractParams {
    /// Monthly, auto-renewing contract without add-ons.
    pub fn new(
        user_id: UserId,
        contact: ContactInfo,
        pricing: PricingVersionRef,
        plan: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            contact,
            pricing,
            plan: plan.into(),
            add_ons: BTreeMap::new(),
            renewal: RenewalPeriod::monthly(),
            auto_renew: true,
            end: None,
        }
    }

    /// Adds an add-on selection.
    #[must_use]
    pub fn with_add_on(mut self, name: impl Into<String>, quantity: u32) -> Self {
        self.add_ons.insert(name.into(), quantity);
        self
    }

    /// Sets the billing terms.
    #[must_use]
    pub const fn with_billing(
        mut self,
        renewal: RenewalPeriod,
        auto_renew: bool,
        end: Option<DateTime<Utc>>,
    ) -> Self {
        self.renewal = renewal;
        self.auto_renew = auto_renew;
        self.end = end;
        self
    }
}

/// Filter and pagination for listing contracts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractFilter {
    /// Only contracts of this service.
    #[serde(default)]
    pub service: Option<String>,
    /// Only contracts on this pricing version label.
    #[serde(default)]
    pub version: Option<String>,
    /// Only contracts on this plan.
    #[serde(default)]
    pub plan: Option<String>,
    /// Only contracts that selected this add-on.
    #[serde(default)]
    pub add_on: Option<String>,
    /// 1-based page number.
    #[serde(default = "default_page")]
    pub page: usize,
    /// Page size, at most [`MAX_PAGE_SIZE`].
    #[serde(default = "default_per_page")]
    pub per_page: usize,
}

impl Default for ContractFilter {
    fn default() -> Self {
        Self {
            service: None,
            version: None,
            plan: None,
            add_on: None,
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

fn default_page() -> usize {
    1
}

fn default_per_page() -> usize {
    20
}

impl ContractFilter {
    /// Filter for one service.
    pub fn service(service: impl Into<String>) -> Self {
        Self { service: Some(service.into()), ..Self::default() }
    }

    /// Returns `true` if `contract` passes every set criterion.
    #[must_use]
    pub fn matches(&self, contract: &Contract) -> bool {
        self.service.as_ref().is_none_or(|s| *s == contract.pricing.service)
            && self.version.as_ref().is_none_or(|v| *v == contract.pricing.version)
            && self.plan.as_ref().is_none_or(|p| *p == contract.plan)
            && self.add_on.as_ref().is_none_or(|a| contract.add_ons.contains_key(a))
    }

    /// Checks the pagination bounds.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ValidationError`] for page 0 or a page size
    /// outside `1..=MAX_PAGE_SIZE`.
    pub fn validate(&self) -> Result<()> {
        if self.page == 0 {
            return Err(EngineError::ValidationError("page is 1-based".into()));
        }
        if self.per_page == 0 || self.per_page > MAX_PAGE_SIZE {
            return Err(EngineError::ValidationError(format!(
                "per_page must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        Ok(())
    }

    /// Number of matches to skip before this page.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.per_page)
    }
}

/// One page of contracts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractPage {
    /// Contracts on this page, ordered by user id.
    pub contracts: Vec<Contract>,
    /// Total matches across all pages.
    pub total: usize,
    /// Page number.
    pub page: usize,
    /// Page size.
    pub per_page: usize,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    // ========================================================================
    // UserId Tests
    // ========================================================================

    #[test]
    fn test_user_id_valid() {
        assert!(UserId::new("user-123").is_ok());
        assert!(UserId::new("clinic_42").is_ok());
        assert!(UserId::new("a".repeat(64)).is_ok());
    }

    #[test]
    fn test_user_id_invalid() {
        assert!(UserId::new("").is_err());
        assert!(UserId::new("a".repeat(65)).is_err());
        assert!(UserId::new("user@example").is_err());
        assert!(UserId::new("user 1").is_err());
    }

    #[test]
    fn test_user_id_serde_validates() {
        let id: UserId = serde_json::from_str("\"user-1\"").unwrap();
        assert_eq!(id.as_str(), "user-1");
        assert!(serde_json::from_str::<UserId>("\"bad id\"").is_err());
    }

    // ========================================================================
    // ContactInfo Tests
    // ========================================================================

    #[test]
    fn test_contact_validation() {
        assert!(ContactInfo::new("alice").with_email("alice@clinic.test").validate().is_ok());
        assert!(ContactInfo::new("  ").validate().is_err());
        assert!(ContactInfo::new("alice").with_email("alice").validate().is_err());
    }

    // ========================================================================
    // ContractFilter Tests
    // ========================================================================

    fn contract(user: &str, plan: &str, add_on: Option<&str>) -> Contract {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut add_ons = BTreeMap::new();
        if let Some(name) = add_on {
            add_ons.insert(name.to_owned(), 1);
        }
        Contract {
            user_id: UserId::new(user).unwrap(),
            contact: ContactInfo::new(user),
            pricing: PricingVersionRef::new("petclinic", "2024"),
            plan: plan.to_owned(),
            add_ons,
            billing_period: BillingPeriod::starting(now, RenewalPeriod::monthly()),
            usage_levels: BTreeMap::new(),
            history: Vec::new(),
            created_at: now,
            updated_at: now,
            revision: 1,
        }
    }

    #[test]
    fn test_filter_matches() {
        let basic = contract("u1", "basic", None);
        let pro = contract("u2", "pro", Some("extraSeats"));

        assert!(ContractFilter::default().matches(&basic));
        assert!(ContractFilter::service("petclinic").matches(&pro));
        assert!(!ContractFilter::service("other").matches(&pro));

        let by_plan = ContractFilter { plan: Some("pro".into()), ..ContractFilter::default() };
        assert!(by_plan.matches(&pro));
        assert!(!by_plan.matches(&basic));

        let by_add_on =
            ContractFilter { add_on: Some("extraSeats".into()), ..ContractFilter::default() };
        assert!(by_add_on.matches(&pro));
        assert!(!by_add_on.matches(&basic));
    }

    #[test]
    fn test_filter_pagination_bounds() {
        assert!(ContractFilter::default().validate().is_ok());
        assert!(ContractFilter { page: 0, ..ContractFilter::default() }.validate().is_err());
        assert!(ContractFilter { per_page: 101, ..ContractFilter::default() }.validate().is_err());
        assert_eq!(ContractFilter { page: 3, per_page: 10, ..ContractFilter::default() }.offset(), 20);
    }

    #[test]
    fn test_fingerprint_ignores_contract_identity() {
        let a = contract("u1", "pro", Some("extraSeats"));
        let b = contract("u2", "pro", Some("extraSeats"));
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), contract("u3", "basic", None).fingerprint());
    }
}
