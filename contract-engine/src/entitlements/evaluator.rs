//! Entitlement evaluation.
//!
//! [`evaluate`] is a pure function of a pricing version, a plan name and an
//! add-on selection. It reads nothing else, so its result can be cached by
//! [`Fingerprint`](super::Fingerprint) and computed on any task.
//!
//! # Algorithm
//!
//! 1. Reject the selection if an add-on is unknown, unavailable for the plan,
//!    missing a dependency, excluded by another selected add-on, or bought in
//!    a quantity its constraints forbid. Nothing is computed on failure.
//! 2. Features start from the version defaults; plan values replace them.
//! 3. Usage limits are those the plan declares (declared without a value
//!    means the version default).
//! 4. Add-ons apply in name order. Each one replaces feature values, then
//!    replaces limit ceilings, then adds `extension × quantity` to numeric
//!    ceilings. A limit the plan does not declare joins the set when an
//!    add-on overrides or extends it.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use super::set::{EntitlementSet, ResolvedLimit};
use crate::{
    catalog::{PricingVersion, UsageLimit, Value},
    error::{EngineError, Result},
};

/// Computes the entitlements of `plan` plus `add_ons` under `pricing`.
///
/// # Errors
///
/// - [`EngineError::NotFound`] if the plan does not exist
/// - [`EngineError::InvalidAddOnSelection`] if the add-on combination is not
///   allowed
/// - [`EngineError::InvalidQuantity`] if a quantity violates its constraints
///   or an extension overflows
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
///
/// use contract_engine::{
///     catalog::{PricingVersion, Value},
///     entitlements::evaluate,
/// };
///
/// let pricing: PricingVersion = serde_json::from_value(serde_json::json!({
///     "service": "petclinic", "version": "v1", "currency": "EUR",
///     "created_at": "2024-01-01T00:00:00Z",
///     "usage_limits": {
///         "seats": {
///             "value_type": "numeric",
///             "default_value": {"type": "numeric", "value": 1},
///             "kind": "NON_RENEWABLE"
///         }
///     },
///     "plans": { "team": { "usage_limits": { "seats": {"type": "numeric", "value": 5} } } },
///     "add_ons": { "moreSeats": { "usage_limits_extensions": { "seats": 5 } } }
/// }))
/// .unwrap();
///
/// let add_ons = BTreeMap::from([("moreSeats".to_owned(), 2)]);
/// let set = evaluate(&pricing, "team", &add_ons).unwrap();
/// assert_eq!(set.usage_limits["seats"].value, Value::numeric(15));
/// ```
pub fn evaluate(
    pricing: &PricingVersion,
    plan_name: &str,
    add_ons: &BTreeMap<String, u32>,
) -> Result<EntitlementSet> {
    let plan = pricing.plan(plan_name)?;
    validate_selection(pricing, plan_name, add_ons)?;

    let mut features: BTreeMap<String, Value> = pricing
        .features
        .iter()
        .map(|(name, feature)| (name.clone(), feature.default_value.clone()))
        .collect();
    for (name, value) in &plan.features {
        features.insert(name.clone(), value.clone());
    }

    let mut ceilings: BTreeMap<String, Value> = BTreeMap::new();
    for (name, value) in &plan.usage_limits {
        let definition = limit_definition(pricing, name)?;
        let value = value.clone().unwrap_or_else(|| definition.default_value.clone());
        ceilings.insert(name.clone(), value);
    }

    for (add_on_name, &quantity) in add_ons {
        let Some(add_on) = pricing.add_ons.get(add_on_name) else {
            return Err(unknown_add_on(add_on_name));
        };

        for (name, value) in &add_on.features {
            features.insert(name.clone(), value.clone());
        }
        for (name, value) in &add_on.usage_limits {
            ceilings.insert(name.clone(), value.clone());
        }
        for (name, extension) in &add_on.usage_limits_extensions {
            let definition = limit_definition(pricing, name)?;
            let ceiling = ceilings
                .entry(name.clone())
                .or_insert_with(|| definition.default_value.clone());
            *ceiling = extend(add_on_name, name, ceiling, *extension, quantity)?;
        }
    }

    let mut usage_limits = BTreeMap::new();
    for (name, value) in ceilings {
        let definition = limit_definition(pricing, &name)?;
        usage_limits.insert(
            name.clone(),
            ResolvedLimit {
                name,
                value,
                kind: definition.kind,
                period: definition.period,
                linked_features: definition.linked_features.clone(),
                trackable: definition.trackable,
                unit: definition.unit.clone(),
            },
        );
    }

    Ok(EntitlementSet {
        pricing: pricing.reference(),
        plan: plan_name.to_owned(),
        add_ons: add_ons.clone(),
        features,
        usage_limits,
    })
}

/// Checks an add-on selection against availability, co-selection and
/// quantity rules without computing anything.
///
/// # Errors
///
/// Returns [`EngineError::InvalidAddOnSelection`] or
/// [`EngineError::InvalidQuantity`] for the first violation found, checking
/// add-ons in name order.
pub fn validate_selection(
    pricing: &PricingVersion,
    plan_name: &str,
    add_ons: &BTreeMap<String, u32>,
) -> Result<()> {
    for name in add_ons.keys() {
        let add_on = pricing.add_ons.get(name).ok_or_else(|| unknown_add_on(name))?;

        if !add_on.is_available_for(plan_name) {
            return Err(EngineError::InvalidAddOnSelection(format!(
                "add-on '{name}' is not available for plan '{plan_name}'"
            )));
        }
        if let Some(missing) = add_on.depends_on.iter().find(|dep| !add_ons.contains_key(*dep)) {
            return Err(EngineError::InvalidAddOnSelection(format!(
                "add-on '{name}' requires add-on '{missing}'"
            )));
        }
        if let Some(excluded) = add_on.excludes.iter().find(|ex| add_ons.contains_key(*ex)) {
            return Err(EngineError::InvalidAddOnSelection(format!(
                "add-on '{name}' cannot be combined with add-on '{excluded}'"
            )));
        }
    }

    for (name, &quantity) in add_ons {
        if let Some(add_on) = pricing.add_ons.get(name) {
            add_on.subscription_constraints.check(name, quantity)?;
        }
    }

    Ok(())
}

fn extend(
    add_on: &str,
    limit: &str,
    ceiling: &Value,
    extension: Decimal,
    quantity: u32,
) -> Result<Value> {
    let Value::Numeric(current) = ceiling else {
        return Err(EngineError::InvalidCatalog(format!(
            "add-on '{add_on}' extends non-numeric usage limit '{limit}'"
        )));
    };
    extension
        .checked_mul(Decimal::from(quantity))
        .and_then(|delta| current.checked_add(delta))
        .map(Value::Numeric)
        .ok_or_else(|| {
            EngineError::InvalidQuantity(format!(
                "{quantity} × add-on '{add_on}' overflows usage limit '{limit}'"
            ))
        })
}

fn limit_definition<'a>(pricing: &'a PricingVersion, name: &str) -> Result<&'a UsageLimit> {
    pricing.usage_limits.get(name).ok_or_else(|| {
        EngineError::InvalidCatalog(format!(
            "{} references undefined usage limit '{name}'",
            pricing.reference()
        ))
    })
}

fn unknown_add_on(name: &str) -> EngineError {
    EngineError::InvalidAddOnSelection(format!("unknown add-on '{name}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::{AddOn, LimitKind, Quantity, fixtures::sample_pricing},
        error::ResourceKind,
    };

    fn selection(pairs: &[(&str, u32)]) -> BTreeMap<String, u32> {
        pairs.iter().map(|(name, qty)| ((*name).to_owned(), *qty)).collect()
    }

    fn ceiling(set: &EntitlementSet, limit: &str) -> Value {
        set.usage_limits[limit].value.clone()
    }

    // ========================================================================
    // Plan resolution
    // ========================================================================

    #[test]
    fn test_basic_plan_defaults() {
        let set = evaluate(&sample_pricing(), "basic", &BTreeMap::new()).unwrap();

        assert_eq!(ceiling(&set, "seats"), Value::numeric(5));
        assert_eq!(ceiling(&set, "apiCalls"), Value::numeric(1000));
        assert!(!set.usage_limits.contains_key("exports"));
        assert!(!set.usage_limits.contains_key("storageGb"));

        assert_eq!(set.features["pets"], Value::Boolean(true));
        assert_eq!(set.features["vetSelection"], Value::Boolean(false));
        assert_eq!(set.features["supportTier"], Value::Text("community".to_owned()));
    }

    #[test]
    fn test_pro_plan_overrides_and_declared_defaults() {
        let set = evaluate(&sample_pricing(), "pro", &BTreeMap::new()).unwrap();

        assert_eq!(ceiling(&set, "seats"), Value::numeric(20));
        assert_eq!(ceiling(&set, "exports"), Value::Boolean(true));
        // Declared without a value: takes the version default.
        assert_eq!(ceiling(&set, "storageGb"), Value::numeric(10));
        assert!(!set.usage_limits["storageGb"].trackable);

        assert_eq!(set.features["vetSelection"], Value::Boolean(true));
        assert_eq!(set.features["supportTier"], Value::Text("priority".to_owned()));

        let api_calls = &set.usage_limits["apiCalls"];
        assert_eq!(api_calls.kind, LimitKind::Renewable);
        assert_eq!(api_calls.linked_features, vec!["visits".to_owned()]);
    }

    #[test]
    fn test_unknown_plan_is_not_found() {
        let err = evaluate(&sample_pricing(), "platinum", &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, EngineError::NotFound { kind: ResourceKind::Plan, .. }));
    }

    // ========================================================================
    // Add-on application
    // ========================================================================

    #[test]
    fn test_extension_scales_with_quantity() {
        let set = evaluate(&sample_pricing(), "basic", &selection(&[("extraCalls", 3)])).unwrap();
        assert_eq!(ceiling(&set, "apiCalls"), Value::numeric(2500));
    }

    #[test]
    fn test_extensions_from_several_add_ons_accumulate() {
        let add_ons = selection(&[("extraCalls", 2), ("callPacks", 4)]);
        let set = evaluate(&sample_pricing(), "basic", &add_ons).unwrap();
        assert_eq!(ceiling(&set, "apiCalls"), Value::numeric(1000 + 2 * 500 + 4 * 250));
    }

    #[test]
    fn test_add_on_introduces_undeclared_limit() {
        let add_ons = selection(&[("analytics", 1), ("extraCalls", 1)]);
        let set = evaluate(&sample_pricing(), "basic", &add_ons).unwrap();

        assert_eq!(ceiling(&set, "exports"), Value::Boolean(true));
        assert_eq!(set.features["exportReports"], Value::Boolean(true));
    }

    #[test]
    fn test_unbounded_override() {
        let set =
            evaluate(&sample_pricing(), "pro", &selection(&[("unlimitedCalls", 1)])).unwrap();
        assert_eq!(ceiling(&set, "apiCalls"), Value::Numeric(Quantity::Unbounded));
    }

    #[test]
    fn test_conflicting_overrides_resolve_lexically() {
        let mut pricing = sample_pricing();
        for (name, value) in [("alpha", 10), ("zulu", 20)] {
            pricing.add_ons.insert(
                name.to_owned(),
                AddOn {
                    usage_limits: BTreeMap::from([("apiCalls".to_owned(), Value::numeric(value))]),
                    ..AddOn::default()
                },
            );
        }

        let add_ons = selection(&[("zulu", 1), ("alpha", 1)]);
        let set = evaluate(&pricing, "basic", &add_ons).unwrap();
        assert_eq!(ceiling(&set, "apiCalls"), Value::numeric(20));
    }

    #[test]
    fn test_override_applies_before_own_extension() {
        let mut pricing = sample_pricing();
        pricing.add_ons.insert(
            "reset".to_owned(),
            AddOn {
                usage_limits: BTreeMap::from([("apiCalls".to_owned(), Value::numeric(100))]),
                usage_limits_extensions: BTreeMap::from([("apiCalls".to_owned(), Decimal::TEN)]),
                ..AddOn::default()
            },
        );

        let set = evaluate(&pricing, "basic", &selection(&[("reset", 3)])).unwrap();
        assert_eq!(ceiling(&set, "apiCalls"), Value::numeric(130));
    }

    #[test]
    fn test_evaluation_is_byte_stable() {
        let pricing = sample_pricing();
        let add_ons = selection(&[("extraCalls", 2), ("analytics", 1)]);
        let first = evaluate(&pricing, "pro", &add_ons).unwrap();
        let second = evaluate(&pricing, "pro", &add_ons).unwrap();
        assert_eq!(first.to_canonical_json().unwrap(), second.to_canonical_json().unwrap());
        assert_eq!(first.fingerprint(), second.fingerprint());
    }

    // ========================================================================
    // Selection validation
    // ========================================================================

    #[test]
    fn test_unknown_add_on() {
        let err = evaluate(&sample_pricing(), "basic", &selection(&[("ghost", 1)])).unwrap_err();
        assert!(matches!(err, EngineError::InvalidAddOnSelection(ref msg) if msg.contains("ghost")));
    }

    #[test]
    fn test_add_on_not_available_for_plan() {
        let err =
            evaluate(&sample_pricing(), "basic", &selection(&[("extraSeats", 1)])).unwrap_err();
        assert!(matches!(err, EngineError::InvalidAddOnSelection(_)));
    }

    #[test]
    fn test_missing_dependency() {
        let err =
            evaluate(&sample_pricing(), "basic", &selection(&[("analytics", 1)])).unwrap_err();
        assert!(matches!(err, EngineError::InvalidAddOnSelection(ref msg) if msg.contains("extraCalls")));
    }

    #[test]
    fn test_exclusion_is_checked_from_either_side() {
        let add_ons = selection(&[("prioritySupport", 1), ("analytics", 1), ("extraCalls", 1)]);
        let err = evaluate(&sample_pricing(), "basic", &add_ons).unwrap_err();
        assert!(matches!(err, EngineError::InvalidAddOnSelection(_)));

        // unlimitedCalls declares the exclusion; extraCalls sorts first.
        let add_ons = selection(&[("extraCalls", 1), ("unlimitedCalls", 1)]);
        let err = evaluate(&sample_pricing(), "pro", &add_ons).unwrap_err();
        assert!(matches!(err, EngineError::InvalidAddOnSelection(_)));
    }

    #[test]
    fn test_quantity_constraints() {
        let pricing = sample_pricing();
        for (qty, ok) in [(1, false), (2, true), (3, false), (10, true), (12, false)] {
            let result = evaluate(&pricing, "basic", &selection(&[("callPacks", qty)]));
            assert_eq!(result.is_ok(), ok, "quantity {qty}");
            if !ok {
                assert!(matches!(result, Err(EngineError::InvalidQuantity(_))));
            }
        }

        let err = evaluate(&pricing, "basic", &selection(&[("extraCalls", 0)])).unwrap_err();
        assert!(matches!(err, EngineError::InvalidQuantity(_)));
    }

    #[test]
    fn test_selection_errors_take_priority_over_quantities() {
        let add_ons = selection(&[("callPacks", 3), ("ghost", 1)]);
        let err = evaluate(&sample_pricing(), "basic", &add_ons).unwrap_err();
        assert!(matches!(err, EngineError::InvalidAddOnSelection(_)));
    }
}
