//! Novation transitions and pruning rules.
//!
//! Novation replaces what a contract is bound to (pricing version, plan,
//! add-ons or billing period) while keeping its identity. The functions here
//! are the pure transitions; validation of the target selection happens
//! before them, when the target entitlement set is evaluated, so a rejected
//! novation never reaches a contract.

use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::models::{BillingPeriod, Contract, UsageLevel};
use crate::{
    catalog::{LimitKind, PricingVersionRef, RenewalPeriod},
    entitlements::EntitlementSet,
};

/// Requested change of a contract's selection. Unset fields keep their
/// current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NovationRequest {
    /// Another version of the same service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing_version: Option<String>,
    /// New plan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    /// Complete new add-on selection, replacing the current one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add_ons: Option<BTreeMap<String, u32>>,
}

impl NovationRequest {
    /// Switches plan, keeping add-ons.
    pub fn plan(plan: impl Into<String>) -> Self {
        Self { plan: Some(plan.into()), ..Self::default() }
    }

    /// Replaces the add-on selection.
    #[must_use]
    pub fn with_add_ons(mut self, add_ons: BTreeMap<String, u32>) -> Self {
        self.add_ons = Some(add_ons);
        self
    }

    /// Moves to another version of the contract's service.
    #[must_use]
    pub fn with_pricing_version(mut self, version: impl Into<String>) -> Self {
        self.pricing_version = Some(version.into());
        self
    }

    /// Selection the contract would have after this novation.
    #[must_use]
    pub fn target(&self, contract: &Contract) -> (PricingVersionRef, String, BTreeMap<String, u32>) {
        let pricing = self.pricing_version.as_ref().map_or_else(
            || contract.pricing.clone(),
            |version| PricingVersionRef::new(contract.pricing.service.clone(), version.clone()),
        );
        let plan = self.plan.clone().unwrap_or_else(|| contract.plan.clone());
        let add_ons = self.add_ons.clone().unwrap_or_else(|| contract.add_ons.clone());
        (pricing, plan, add_ons)
    }
}

/// New billing terms for [`novate_billing_period`](crate::manager::ContractManager::novate_billing_period).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingPeriodUpdate {
    /// New cycle length.
    pub renewal: RenewalPeriod,
    /// Whether the contract renews automatically.
    #[serde(default = "default_auto_renew")]
    pub auto_renew: bool,
    /// Fixed end of term.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
}

fn default_auto_renew() -> bool {
    true
}

impl BillingPeriodUpdate {
    /// Auto-renewing terms with the given cycle length.
    #[must_use]
    pub const fn new(renewal: RenewalPeriod) -> Self {
        Self { renewal, auto_renew: true, end: None }
    }
}

/// Usage levels for a new contract: one zeroed level per trackable limit.
#[must_use]
pub fn initial_levels(entitlements: &EntitlementSet, now: DateTime<Utc>) -> BTreeMap<String, UsageLevel> {
    entitlements
        .trackable_limits()
        .map(|limit| (limit.name.clone(), UsageLevel::fresh(now)))
        .collect()
}

/// Re-bases usage levels onto a new entitlement set.
///
/// Limits still tracked keep their consumption and cycle anchor, limits no
/// longer tracked are dropped, and newly tracked limits start at zero from
/// `now`.
#[must_use]
pub fn rebase_levels(
    levels: &BTreeMap<String, UsageLevel>,
    target: &EntitlementSet,
    now: DateTime<Utc>,
) -> BTreeMap<String, UsageLevel> {
    target
        .trackable_limits()
        .map(|limit| {
            let level = levels.get(&limit.name).copied().unwrap_or_else(|| UsageLevel::fresh(now));
            (limit.name.clone(), level)
        })
        .collect()
}

/// Binds `contract` to the selection of `target`.
///
/// The previous selection is recorded in history when anything changes.
/// Returns `true` if the selection changed.
pub fn apply_selection(contract: &mut Contract, target: &EntitlementSet, now: DateTime<Utc>) -> bool {
    let changed = contract.pricing != target.pricing
        || contract.plan != target.plan
        || contract.add_ons != target.add_ons;
    if !changed {
        return false;
    }

    contract.history.push(contract.snapshot(now));
    contract.pricing = target.pricing.clone();
    contract.plan = target.plan.clone();
    contract.add_ons = target.add_ons.clone();
    contract.usage_levels = rebase_levels(&contract.usage_levels, target, now);
    true
}

/// Replaces the billing terms and starts a fresh cycle at `now`.
///
/// Every renewable level is zeroed and re-anchored to `now`; non-renewable
/// levels are untouched.
pub fn apply_billing_period(
    contract: &mut Contract,
    update: BillingPeriodUpdate,
    entitlements: &EntitlementSet,
    now: DateTime<Utc>,
) {
    contract.history.push(contract.snapshot(now));
    contract.billing_period =
        BillingPeriod { start: now, renewal: update.renewal, auto_renew: update.auto_renew, end: update.end };

    for (name, level) in &mut contract.usage_levels {
        let renewable = entitlements
            .usage_limits
            .get(name)
            .is_some_and(|limit| limit.kind == LimitKind::Renewable);
        if renewable {
            *level = UsageLevel::fresh(now);
        }
    }
}

/// Decides which contracts [`prune_expired_contracts`](crate::manager::ContractManager::prune_expired_contracts)
/// removes.
pub trait PruneRule: Send + Sync + fmt::Debug {
    /// Returns `true` if `contract` should be removed at `now`.
    fn is_expired(&self, contract: &Contract, now: DateTime<Utc>) -> bool;
}

/// Prunes non-renewing contracts whose term ended more than `grace` ago.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingPeriodExpiry {
    /// How long an ended contract is kept.
    pub grace: chrono::Duration,
}

impl BillingPeriodExpiry {
    /// Rule with the given grace period.
    #[must_use]
    pub const fn new(grace: chrono::Duration) -> Self {
        Self { grace }
    }
}

impl Default for BillingPeriodExpiry {
    fn default() -> Self {
        Self::new(chrono::Duration::zero())
    }
}

impl PruneRule for BillingPeriodExpiry {
    fn is_expired(&self, contract: &Contract, now: DateTime<Utc>) -> bool {
        let billing = &contract.billing_period;
        if billing.auto_renew {
            return false;
        }
        billing
            .end
            .and_then(|end| end.checked_add_signed(self.grace))
            .is_some_and(|cutoff| cutoff < now)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use rust_decimal::Decimal;

    use super::*;
    use crate::{
        catalog::fixtures::sample_pricing,
        contract::models::{ContactInfo, UserId},
        entitlements::evaluate,
    };

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn set(plan: &str, add_ons: &[(&str, u32)]) -> EntitlementSet {
        let add_ons = add_ons.iter().map(|(name, qty)| ((*name).to_owned(), *qty)).collect();
        evaluate(&sample_pricing(), plan, &add_ons).unwrap()
    }

    fn contract_on(entitlements: &EntitlementSet) -> Contract {
        Contract {
            user_id: UserId::new("alice").unwrap(),
            contact: ContactInfo::new("alice"),
            pricing: entitlements.pricing.clone(),
            plan: entitlements.plan.clone(),
            add_ons: entitlements.add_ons.clone(),
            billing_period: BillingPeriod::starting(t0(), RenewalPeriod::monthly()),
            usage_levels: initial_levels(entitlements, t0()),
            history: Vec::new(),
            created_at: t0(),
            updated_at: t0(),
            revision: 1,
        }
    }

    #[test]
    fn test_initial_levels_cover_trackable_limits() {
        let levels = initial_levels(&set("pro", &[]), t0());
        let names: Vec<&str> = levels.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["apiCalls", "exports", "seats"]);
        assert!(levels.values().all(|level| level.consumed.is_zero()));
    }

    #[test]
    fn test_upgrade_carries_consumption_over() {
        let basic = set("basic", &[]);
        let mut contract = contract_on(&basic);
        contract.usage_levels.get_mut("apiCalls").unwrap().consumed = Decimal::from(400);

        let later = t0() + Duration::days(3);
        assert!(apply_selection(&mut contract, &set("pro", &[]), later));

        assert_eq!(contract.plan, "pro");
        assert_eq!(contract.usage_levels["apiCalls"].consumed, Decimal::from(400));
        assert_eq!(contract.usage_levels["apiCalls"].period_start, t0());
        // Newly granted limit starts fresh at the novation instant.
        assert_eq!(contract.usage_levels["exports"], UsageLevel::fresh(later));
        assert_eq!(contract.history.len(), 1);
        assert_eq!(contract.history[0].plan, "basic");
        assert_eq!(contract.history[0].replaced_at, later);
    }

    #[test]
    fn test_downgrade_drops_missing_limits() {
        let pro = set("pro", &[]);
        let mut contract = contract_on(&pro);
        contract.usage_levels.get_mut("exports").unwrap().consumed = Decimal::ONE;

        apply_selection(&mut contract, &set("basic", &[]), t0());
        assert!(!contract.usage_levels.contains_key("exports"));
    }

    #[test]
    fn test_quantity_change_carries_over() {
        let mut contract = contract_on(&set("basic", &[("extraCalls", 1)]));
        contract.usage_levels.get_mut("apiCalls").unwrap().consumed = Decimal::from(1200);

        assert!(apply_selection(&mut contract, &set("basic", &[("extraCalls", 3)]), t0()));
        assert_eq!(contract.add_ons["extraCalls"], 3);
        assert_eq!(contract.usage_levels["apiCalls"].consumed, Decimal::from(1200));
    }

    #[test]
    fn test_unchanged_selection_is_not_recorded() {
        let basic = set("basic", &[]);
        let mut contract = contract_on(&basic);
        assert!(!apply_selection(&mut contract, &basic, t0()));
        assert!(contract.history.is_empty());
    }

    #[test]
    fn test_billing_change_resets_renewable_levels_only() {
        let basic = set("basic", &[]);
        let mut contract = contract_on(&basic);
        contract.usage_levels.get_mut("apiCalls").unwrap().consumed = Decimal::from(700);
        contract.usage_levels.get_mut("seats").unwrap().consumed = Decimal::from(4);

        let now = t0() + Duration::days(10);
        let update = BillingPeriodUpdate::new(RenewalPeriod::new(1, crate::catalog::PeriodUnit::Years));
        apply_billing_period(&mut contract, update, &basic, now);

        assert_eq!(contract.billing_period.start, now);
        assert_eq!(contract.usage_levels["apiCalls"], UsageLevel::fresh(now));
        assert_eq!(contract.usage_levels["seats"].consumed, Decimal::from(4));
        assert_eq!(contract.usage_levels["seats"].period_start, t0());
        assert_eq!(contract.history.len(), 1);
    }

    #[test]
    fn test_target_fills_unset_fields() {
        let contract = contract_on(&set("basic", &[("extraCalls", 2)]));
        let (pricing, plan, add_ons) =
            NovationRequest::plan("pro").with_pricing_version("2025").target(&contract);
        assert_eq!(pricing, PricingVersionRef::new("petclinic", "2025"));
        assert_eq!(plan, "pro");
        assert_eq!(add_ons, contract.add_ons);
    }

    #[test]
    fn test_billing_period_expiry() {
        let rule = BillingPeriodExpiry::new(Duration::days(7));
        let mut contract = contract_on(&set("basic", &[]));
        let end = t0() + Duration::days(30);

        assert!(!rule.is_expired(&contract, end + Duration::days(365)));

        contract.billing_period.end = Some(end);
        assert!(!rule.is_expired(&contract, end + Duration::days(365)), "auto-renewing");

        contract.billing_period.auto_renew = false;
        assert!(!rule.is_expired(&contract, end + Duration::days(7)));
        assert!(rule.is_expired(&contract, end + Duration::days(8)));
    }
}
