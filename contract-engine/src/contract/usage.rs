//! Usage-limit tracking and lazy renewal.
//!
//! A [`UsageTracker`] applies consumption changes to a [`Contract`] against
//! the ceilings of an already resolved [`EntitlementSet`] at a fixed instant.
//! It never resolves entitlements itself and never persists anything; the
//! manager does both around it.
//!
//! Renewal is lazy: a renewable level whose cycle has ended is reset when it
//! is next read or written, and its `period_start` advances by whole cycles
//! so missed renewals never drift towards the read time.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::models::{BillingPeriod, Contract, UsageLevel};
use crate::{
    catalog::{LimitKind, Quantity, RenewalPeriod, Value},
    entitlements::{EntitlementSet, FeatureEvaluation, ResolvedLimit},
    error::{EngineError, ResourceKind, Result},
};

/// Consumption of one limit as seen at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    /// Limit name.
    pub limit: String,
    /// Amount consumed in the current cycle.
    pub consumed: Decimal,
    /// Effective ceiling.
    pub ceiling: Value,
    /// What is left before the ceiling, never negative.
    pub remaining: Quantity,
    /// Start of the current cycle.
    pub period_start: DateTime<Utc>,
    /// When consumption next resets; `None` for non-renewable limits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_reset: Option<DateTime<Utc>>,
}

/// Renewal cadence of a limit under a contract's billing period.
///
/// Renewable limits follow their own period when they declare one and the
/// billing period otherwise. Non-renewable limits have no cadence.
#[must_use]
pub fn cadence(limit: &ResolvedLimit, billing: &BillingPeriod) -> Option<RenewalPeriod> {
    match limit.kind {
        LimitKind::Renewable => Some(limit.period.unwrap_or(billing.renewal)),
        LimitKind::NonRenewable => None,
    }
}

/// Applies usage transitions against resolved ceilings at a fixed instant.
#[derive(Debug, Clone, Copy)]
pub struct UsageTracker<'a> {
    entitlements: &'a EntitlementSet,
    now: DateTime<Utc>,
}

impl<'a> UsageTracker<'a> {
    /// Creates a tracker for `entitlements` evaluated at `now`.
    #[must_use]
    pub const fn new(entitlements: &'a EntitlementSet, now: DateTime<Utc>) -> Self {
        Self { entitlements, now }
    }

    /// Lazily renews every renewable level whose cycle has ended.
    ///
    /// Returns `true` if any level changed.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Internal`] if cycle arithmetic overflows.
    pub fn renew(&self, contract: &mut Contract) -> Result<bool> {
        let billing = contract.billing_period;
        let mut changed = false;
        for (name, level) in &mut contract.usage_levels {
            let Some(limit) = self.entitlements.usage_limits.get(name) else {
                continue;
            };
            changed |= renew_level(name, level, cadence(limit, &billing), self.now)?;
        }
        Ok(changed)
    }

    /// Current consumption of `limit`.
    ///
    /// Call [`UsageTracker::renew`] first; the snapshot reflects the levels
    /// as stored.
    ///
    /// # Errors
    ///
    /// - [`EngineError::LimitNotFound`] if the selection does not grant it
    /// - [`EngineError::ValidationError`] if the limit is not trackable
    pub fn snapshot(&self, contract: &Contract, limit: &str) -> Result<UsageSnapshot> {
        let resolved = self.trackable(limit)?;
        let level = contract
            .usage_levels
            .get(limit)
            .copied()
            .unwrap_or_else(|| UsageLevel::fresh(self.now));
        Ok(self.describe(resolved, &level, &contract.billing_period))
    }

    /// Snapshots of every trackable limit, keyed by name.
    ///
    /// # Errors
    ///
    /// See [`UsageTracker::snapshot`].
    pub fn summary(&self, contract: &Contract) -> Result<BTreeMap<String, UsageSnapshot>> {
        self.entitlements
            .trackable_limits()
            .map(|limit| Ok((limit.name.clone(), self.snapshot(contract, &limit.name)?)))
            .collect()
    }

    /// Adds `delta` to the consumption of `limit`.
    ///
    /// Renews the level first. Numeric limits reject a total above the
    /// ceiling; unbounded ceilings never reject. Boolean limits accept only
    /// 0 or 1, and setting 1 again is a no-op. On error the contract is left
    /// unchanged.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidDelta`] for a negative delta or a boolean delta
    ///   other than 0/1
    /// - [`EngineError::LimitExceeded`] if the ceiling would be passed
    /// - see [`UsageTracker::snapshot`]
    pub fn increment(
        &self,
        contract: &mut Contract,
        limit: &str,
        delta: Decimal,
    ) -> Result<UsageSnapshot> {
        if delta.is_sign_negative() && !delta.is_zero() {
            return Err(EngineError::InvalidDelta(format!(
                "usage of '{limit}' can only grow, got {delta}"
            )));
        }
        let resolved = self.trackable(limit)?;
        let billing = contract.billing_period;

        let mut level = self.renewed_level(contract, resolved, &billing)?;
        level.consumed = self.checked_total(resolved, level.consumed, delta)?;
        contract.usage_levels.insert(limit.to_owned(), level);

        Ok(self.describe(resolved, &level, &billing))
    }

    /// Administrative correction of `limit` by a signed `delta`.
    ///
    /// Positive deltas follow [`UsageTracker::increment`]. Negative deltas
    /// lower consumption, clamping at zero.
    ///
    /// # Errors
    ///
    /// See [`UsageTracker::increment`].
    pub fn correct(
        &self,
        contract: &mut Contract,
        limit: &str,
        delta: Decimal,
    ) -> Result<UsageSnapshot> {
        if !delta.is_sign_negative() || delta.is_zero() {
            return self.increment(contract, limit, delta);
        }
        let resolved = self.trackable(limit)?;
        let billing = contract.billing_period;

        let mut level = self.renewed_level(contract, resolved, &billing)?;
        level.consumed = (level.consumed + delta).max(Decimal::ZERO);
        contract.usage_levels.insert(limit.to_owned(), level);

        Ok(self.describe(resolved, &level, &billing))
    }

    /// Whether `feature` is usable right now.
    ///
    /// A feature is enabled when its value grants access and none of the
    /// limits gating it is exhausted. Untracked gating limits count as
    /// exhausted only when their ceiling grants nothing.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] if the feature does not exist.
    pub fn evaluate_feature(&self, contract: &Contract, feature: &str) -> Result<FeatureEvaluation> {
        let value = self.entitlements.features.get(feature).cloned().ok_or_else(|| {
            EngineError::NotFound { kind: ResourceKind::Feature, id: feature.to_owned() }
        })?;

        let mut exhausted_limits = Vec::new();
        for limit in self.entitlements.limits_gating(feature) {
            let exhausted = if limit.trackable {
                !self.snapshot(contract, &limit.name)?.remaining.is_positive()
            } else {
                !limit.value.is_enabled()
            };
            if exhausted {
                exhausted_limits.push(limit.name.clone());
            }
        }

        Ok(FeatureEvaluation {
            feature: feature.to_owned(),
            enabled: value.is_enabled() && exhausted_limits.is_empty(),
            value,
            exhausted_limits,
        })
    }

    fn trackable(&self, limit: &str) -> Result<&'a ResolvedLimit> {
        let resolved = self.entitlements.limit(limit)?;
        if !resolved.trackable {
            return Err(EngineError::ValidationError(format!(
                "usage limit '{limit}' is not tracked"
            )));
        }
        Ok(resolved)
    }

    fn renewed_level(
        &self,
        contract: &Contract,
        limit: &ResolvedLimit,
        billing: &BillingPeriod,
    ) -> Result<UsageLevel> {
        let mut level = contract
            .usage_levels
            .get(&limit.name)
            .copied()
            .unwrap_or_else(|| UsageLevel::fresh(self.now));
        renew_level(&limit.name, &mut level, cadence(limit, billing), self.now)?;
        Ok(level)
    }

    fn checked_total(&self, limit: &ResolvedLimit, consumed: Decimal, delta: Decimal) -> Result<Decimal> {
        let exceeded = |ceiling: &Value| EngineError::LimitExceeded {
            limit: limit.name.clone(),
            consumed: consumed.to_string(),
            requested: delta.to_string(),
            ceiling: ceiling.to_string(),
        };

        match &limit.value {
            Value::Boolean(allowed) => {
                if delta.is_zero() {
                    Ok(consumed)
                } else if delta != Decimal::ONE {
                    Err(EngineError::InvalidDelta(format!(
                        "boolean usage limit '{}' accepts only 0 or 1, got {delta}",
                        limit.name
                    )))
                } else if *allowed {
                    Ok(Decimal::ONE)
                } else {
                    Err(exceeded(&limit.value))
                }
            }
            Value::Numeric(ceiling) => {
                let total = consumed.checked_add(delta).ok_or_else(|| {
                    EngineError::InvalidDelta(format!("delta {delta} overflows '{}'", limit.name))
                })?;
                if ceiling.allows(total) { Ok(total) } else { Err(exceeded(&limit.value)) }
            }
            Value::Text(_) => Err(EngineError::Internal(format!(
                "usage limit '{}' resolved to a text value",
                limit.name
            ))),
        }
    }

    fn describe(
        &self,
        limit: &ResolvedLimit,
        level: &UsageLevel,
        billing: &BillingPeriod,
    ) -> UsageSnapshot {
        let remaining = match &limit.value {
            Value::Numeric(ceiling) => ceiling.remaining(level.consumed),
            Value::Boolean(true) => Quantity::Finite((Decimal::ONE - level.consumed).max(Decimal::ZERO)),
            Value::Boolean(false) | Value::Text(_) => Quantity::Finite(Decimal::ZERO),
        };
        UsageSnapshot {
            limit: limit.name.clone(),
            consumed: level.consumed,
            ceiling: limit.value.clone(),
            remaining,
            period_start: level.period_start,
            next_reset: cadence(limit, billing)
                .and_then(|period| period.next_cycle_start(level.anchor, level.period_start)),
        }
    }
}

/// Resets consumption without waiting for the cycle to end.
///
/// `names = None` resets every level. Cycle anchors are kept, so renewable
/// limits still renew on their usual boundaries. Returns `true` if any level
/// changed.
///
/// # Errors
///
/// Returns [`EngineError::LimitNotFound`] for a name the contract does not
/// track; nothing is reset in that case.
pub fn reset_levels(contract: &mut Contract, names: Option<&[String]>) -> Result<bool> {
    if let Some(names) = names
        && let Some(unknown) = names.iter().find(|name| !contract.usage_levels.contains_key(*name))
    {
        return Err(EngineError::LimitNotFound(unknown.clone()));
    }

    let mut changed = false;
    for (name, level) in &mut contract.usage_levels {
        let selected = names.is_none_or(|names| names.contains(name));
        if selected && !level.consumed.is_zero() {
            level.consumed = Decimal::ZERO;
            changed = true;
        }
    }
    Ok(changed)
}

fn renew_level(
    name: &str,
    level: &mut UsageLevel,
    period: Option<RenewalPeriod>,
    now: DateTime<Utc>,
) -> Result<bool> {
    let Some(period) = period else {
        return Ok(false);
    };
    let cycle_start = period.current_cycle_start(level.anchor, now).ok_or_else(|| {
        EngineError::Internal(format!("renewal arithmetic overflowed for '{name}'"))
    })?;
    if cycle_start > level.period_start {
        tracing::debug!(
            limit = name,
            from = %level.period_start,
            to = %cycle_start,
            "Renewed usage level"
        );
        level.period_start = cycle_start;
        level.consumed = Decimal::ZERO;
        return Ok(true);
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::{
        catalog::{PeriodUnit, PricingVersionRef, fixtures::sample_pricing},
        contract::models::{ContactInfo, UserId},
        entitlements::evaluate,
    };

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn entitlements(plan: &str) -> EntitlementSet {
        evaluate(&sample_pricing(), plan, &BTreeMap::new()).unwrap()
    }

    fn contract_for(set: &EntitlementSet) -> Contract {
        let usage_levels = set
            .trackable_limits()
            .map(|limit| (limit.name.clone(), UsageLevel::fresh(t0())))
            .collect();
        Contract {
            user_id: UserId::new("user-1").unwrap(),
            contact: ContactInfo::new("alice"),
            pricing: PricingVersionRef::new("petclinic", "2024"),
            plan: set.plan.clone(),
            add_ons: BTreeMap::new(),
            billing_period: BillingPeriod::starting(t0(), RenewalPeriod::monthly()),
            usage_levels,
            history: Vec::new(),
            created_at: t0(),
            updated_at: t0(),
            revision: 1,
        }
    }

    fn dec(value: i64) -> Decimal {
        Decimal::from(value)
    }

    // ========================================================================
    // Increment
    // ========================================================================

    #[test]
    fn test_increment_within_ceiling() {
        let set = entitlements("basic");
        let mut contract = contract_for(&set);
        let tracker = UsageTracker::new(&set, t0());

        let snapshot = tracker.increment(&mut contract, "seats", dec(3)).unwrap();
        assert_eq!(snapshot.consumed, dec(3));
        assert_eq!(snapshot.remaining, Quantity::Finite(dec(2)));
        assert_eq!(snapshot.next_reset, None);
    }

    #[test]
    fn test_exceeding_ceiling_leaves_consumption_unchanged() {
        let mut set = entitlements("basic");
        set.usage_limits.get_mut("apiCalls").unwrap().value = Value::numeric(100);
        let mut contract = contract_for(&set);
        let tracker = UsageTracker::new(&set, t0());

        tracker.increment(&mut contract, "apiCalls", dec(95)).unwrap();
        let err = tracker.increment(&mut contract, "apiCalls", dec(10)).unwrap_err();

        assert!(matches!(err, EngineError::LimitExceeded { ref consumed, .. } if consumed == "95"));
        assert_eq!(contract.usage_levels["apiCalls"].consumed, dec(95));
    }

    #[test]
    fn test_exact_ceiling_is_allowed() {
        let set = entitlements("basic");
        let mut contract = contract_for(&set);
        let tracker = UsageTracker::new(&set, t0());
        assert!(tracker.increment(&mut contract, "seats", dec(5)).is_ok());
        assert!(tracker.increment(&mut contract, "seats", dec(1)).is_err());
    }

    #[test]
    fn test_unbounded_is_never_exceeded() {
        let mut set = entitlements("basic");
        set.usage_limits.get_mut("apiCalls").unwrap().value = Value::Numeric(Quantity::Unbounded);
        let mut contract = contract_for(&set);
        let tracker = UsageTracker::new(&set, t0());

        let snapshot = tracker.increment(&mut contract, "apiCalls", Decimal::MAX).unwrap();
        assert_eq!(snapshot.remaining, Quantity::Unbounded);
    }

    #[test]
    fn test_negative_delta_is_rejected() {
        let set = entitlements("basic");
        let mut contract = contract_for(&set);
        let err = UsageTracker::new(&set, t0())
            .increment(&mut contract, "seats", dec(-1))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidDelta(_)));
    }

    #[test]
    fn test_unknown_and_untracked_limits() {
        let set = entitlements("pro");
        let mut contract = contract_for(&set);
        let tracker = UsageTracker::new(&set, t0());

        assert!(matches!(
            tracker.increment(&mut contract, "bandwidth", dec(1)),
            Err(EngineError::LimitNotFound(_))
        ));
        assert!(matches!(
            tracker.increment(&mut contract, "storageGb", dec(1)),
            Err(EngineError::ValidationError(_))
        ));
    }

    // ========================================================================
    // Boolean limits
    // ========================================================================

    #[test]
    fn test_boolean_limit_is_idempotent() {
        let set = entitlements("pro");
        let mut contract = contract_for(&set);
        let tracker = UsageTracker::new(&set, t0());

        assert_eq!(tracker.increment(&mut contract, "exports", dec(0)).unwrap().consumed, dec(0));
        assert_eq!(tracker.increment(&mut contract, "exports", dec(1)).unwrap().consumed, dec(1));
        let again = tracker.increment(&mut contract, "exports", dec(1)).unwrap();
        assert_eq!(again.consumed, dec(1));
        assert_eq!(again.remaining, Quantity::Finite(dec(0)));

        assert!(matches!(
            tracker.increment(&mut contract, "exports", dec(2)),
            Err(EngineError::InvalidDelta(_))
        ));
    }

    #[test]
    fn test_boolean_false_rejects_use() {
        let mut set = entitlements("pro");
        set.usage_limits.get_mut("exports").unwrap().value = Value::Boolean(false);
        let mut contract = contract_for(&set);

        let err = UsageTracker::new(&set, t0())
            .increment(&mut contract, "exports", dec(1))
            .unwrap_err();
        assert!(matches!(err, EngineError::LimitExceeded { .. }));
    }

    // ========================================================================
    // Renewal
    // ========================================================================

    #[test]
    fn test_renewal_after_missed_cycles_does_not_drift() {
        let set = entitlements("basic");
        let mut contract = contract_for(&set);
        UsageTracker::new(&set, t0()).increment(&mut contract, "apiCalls", dec(400)).unwrap();
        UsageTracker::new(&set, t0()).increment(&mut contract, "seats", dec(2)).unwrap();

        // Roughly 3.2 months later.
        let later = Utc.with_ymd_and_hms(2024, 4, 7, 6, 0, 0).unwrap();
        let tracker = UsageTracker::new(&set, later);
        assert!(tracker.renew(&mut contract).unwrap());

        let api_calls = tracker.snapshot(&contract, "apiCalls").unwrap();
        assert_eq!(api_calls.consumed, dec(0));
        assert_eq!(api_calls.period_start, Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap());
        assert_eq!(api_calls.next_reset, Some(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()));

        // Non-renewable limits keep accumulating.
        assert_eq!(tracker.snapshot(&contract, "seats").unwrap().consumed, dec(2));
        assert!(!tracker.renew(&mut contract).unwrap());
    }

    #[test]
    fn test_chained_renewals_keep_month_end_anchor() {
        let set = entitlements("basic");
        let mut contract = contract_for(&set);
        let jan_31 = Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap();
        contract.usage_levels.insert("apiCalls".to_owned(), UsageLevel::fresh(jan_31));

        // Each renewal is stored before the next one is computed.
        for (now, expected) in [((3, 5), (2, 29)), ((4, 5), (3, 31)), ((5, 5), (4, 30)), ((6, 5), (5, 31))] {
            let now = Utc.with_ymd_and_hms(2024, now.0, now.1, 0, 0, 0).unwrap();
            let tracker = UsageTracker::new(&set, now);
            tracker.increment(&mut contract, "apiCalls", dec(10)).unwrap();
            let snapshot = tracker.snapshot(&contract, "apiCalls").unwrap();
            let expected = Utc.with_ymd_and_hms(2024, expected.0, expected.1, 0, 0, 0).unwrap();
            assert_eq!(snapshot.period_start, expected);
            assert_eq!(snapshot.consumed, dec(10));
        }

        let level = contract.usage_levels["apiCalls"];
        assert_eq!(level.anchor, jan_31);
        let snapshot = UsageTracker::new(&set, level.period_start).snapshot(&contract, "apiCalls").unwrap();
        assert_eq!(snapshot.next_reset, Some(Utc.with_ymd_and_hms(2024, 6, 30, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_increment_renews_before_checking() {
        let mut set = entitlements("basic");
        set.usage_limits.get_mut("apiCalls").unwrap().value = Value::numeric(100);
        let mut contract = contract_for(&set);
        UsageTracker::new(&set, t0()).increment(&mut contract, "apiCalls", dec(100)).unwrap();

        let next_month = t0() + Duration::days(31);
        let snapshot = UsageTracker::new(&set, next_month)
            .increment(&mut contract, "apiCalls", dec(10))
            .unwrap();
        assert_eq!(snapshot.consumed, dec(10));
        assert_eq!(snapshot.period_start, Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_renewable_without_period_follows_billing_cadence() {
        let mut set = entitlements("basic");
        set.usage_limits.get_mut("apiCalls").unwrap().period = None;
        let mut contract = contract_for(&set);
        contract.billing_period.renewal = RenewalPeriod::new(7, PeriodUnit::Days);
        UsageTracker::new(&set, t0()).increment(&mut contract, "apiCalls", dec(5)).unwrap();

        let tracker = UsageTracker::new(&set, t0() + Duration::days(15));
        tracker.renew(&mut contract).unwrap();
        let snapshot = tracker.snapshot(&contract, "apiCalls").unwrap();
        assert_eq!(snapshot.consumed, dec(0));
        assert_eq!(snapshot.period_start, t0() + Duration::days(14));
    }

    // ========================================================================
    // Corrections and resets
    // ========================================================================

    #[test]
    fn test_correction_clamps_at_zero() {
        let set = entitlements("basic");
        let mut contract = contract_for(&set);
        let tracker = UsageTracker::new(&set, t0());
        tracker.increment(&mut contract, "seats", dec(3)).unwrap();

        assert_eq!(tracker.correct(&mut contract, "seats", dec(-2)).unwrap().consumed, dec(1));
        assert_eq!(tracker.correct(&mut contract, "seats", dec(-5)).unwrap().consumed, dec(0));
        assert!(matches!(
            tracker.correct(&mut contract, "seats", dec(6)),
            Err(EngineError::LimitExceeded { .. })
        ));
    }

    #[test]
    fn test_reset_selected_and_all_levels() {
        let set = entitlements("basic");
        let mut contract = contract_for(&set);
        let tracker = UsageTracker::new(&set, t0());
        tracker.increment(&mut contract, "seats", dec(3)).unwrap();
        tracker.increment(&mut contract, "apiCalls", dec(30)).unwrap();

        assert!(reset_levels(&mut contract, Some(&["seats".to_owned()])).unwrap());
        assert_eq!(contract.usage_levels["seats"].consumed, dec(0));
        assert_eq!(contract.usage_levels["apiCalls"].consumed, dec(30));

        assert!(reset_levels(&mut contract, None).unwrap());
        assert_eq!(contract.usage_levels["apiCalls"].consumed, dec(0));
        assert!(!reset_levels(&mut contract, None).unwrap());
    }

    #[test]
    fn test_reset_unknown_limit_changes_nothing() {
        let set = entitlements("basic");
        let mut contract = contract_for(&set);
        UsageTracker::new(&set, t0()).increment(&mut contract, "seats", dec(3)).unwrap();

        let names = ["seats".to_owned(), "ghost".to_owned()];
        assert!(matches!(reset_levels(&mut contract, Some(&names)), Err(EngineError::LimitNotFound(_))));
        assert_eq!(contract.usage_levels["seats"].consumed, dec(3));
    }

    // ========================================================================
    // Feature evaluation and summaries
    // ========================================================================

    #[test]
    fn test_feature_disabled_when_gating_limit_exhausted() {
        let set = entitlements("basic");
        let mut contract = contract_for(&set);
        let tracker = UsageTracker::new(&set, t0());

        assert!(tracker.evaluate_feature(&contract, "pets").unwrap().enabled);
        tracker.increment(&mut contract, "seats", dec(5)).unwrap();

        let evaluation = tracker.evaluate_feature(&contract, "pets").unwrap();
        assert!(!evaluation.enabled);
        assert_eq!(evaluation.exhausted_limits, vec!["seats".to_owned()]);

        assert!(!tracker.evaluate_feature(&contract, "vetSelection").unwrap().enabled);
        assert!(matches!(
            tracker.evaluate_feature(&contract, "teleportation"),
            Err(EngineError::NotFound { kind: ResourceKind::Feature, .. })
        ));
    }

    #[test]
    fn test_summary_lists_trackable_limits_only() {
        let set = entitlements("pro");
        let contract = contract_for(&set);
        let summary = UsageTracker::new(&set, t0()).summary(&contract).unwrap();

        let names: Vec<&str> = summary.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["apiCalls", "exports", "seats"]);
    }
}
