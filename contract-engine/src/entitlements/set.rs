//! Resolved entitlements.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Fingerprint;
use crate::{
    catalog::{LimitKind, PricingVersionRef, RenewalPeriod, Value},
    error::{EngineError, Result},
};

/// Usage limit as granted to one selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedLimit {
    /// Limit name.
    pub name: String,
    /// Effective ceiling after plan and add-ons.
    pub value: Value,
    /// Renewal behaviour.
    pub kind: LimitKind,
    /// Own renewal cycle, if declared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<RenewalPeriod>,
    /// Features this limit gates.
    #[serde(default)]
    pub linked_features: Vec<String>,
    /// Whether consumption is tracked.
    pub trackable: bool,
    /// Display unit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// Effective features and usage limits of a (pricing version, plan, add-ons)
/// selection.
///
/// Immutable once computed; shared between contracts through the
/// entitlement cache. Maps are ordered so serialization is byte-stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementSet {
    /// Pricing version the set was computed from.
    pub pricing: PricingVersionRef,
    /// Plan name.
    pub plan: String,
    /// Add-on quantities.
    pub add_ons: BTreeMap<String, u32>,
    /// Effective feature values.
    pub features: BTreeMap<String, Value>,
    /// Effective usage limits.
    pub usage_limits: BTreeMap<String, ResolvedLimit>,
}

impl EntitlementSet {
    /// Cache key of the selection this set was computed for.
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::compute(&self.pricing, &self.plan, &self.add_ons)
    }

    /// Looks up a usage limit.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::LimitNotFound`] if the selection does not grant
    /// the limit.
    pub fn limit(&self, name: &str) -> Result<&ResolvedLimit> {
        self.usage_limits.get(name).ok_or_else(|| EngineError::LimitNotFound(name.to_owned()))
    }

    /// Limits whose consumption is tracked per contract.
    pub fn trackable_limits(&self) -> impl Iterator<Item = &ResolvedLimit> {
        self.usage_limits.values().filter(|limit| limit.trackable)
    }

    /// Limits gating `feature`.
    pub fn limits_gating<'a>(&'a self, feature: &'a str) -> impl Iterator<Item = &'a ResolvedLimit> {
        self.usage_limits
            .values()
            .filter(move |limit| limit.linked_features.iter().any(|f| f == feature))
    }

    /// Canonical JSON encoding.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Internal`] if serialization fails.
    pub fn to_canonical_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| EngineError::Internal(format!("entitlement serialization failed: {e}")))
    }
}

/// Result of a feature authorization check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureEvaluation {
    /// Feature name.
    pub feature: String,
    /// Effective feature value.
    pub value: Value,
    /// `true` when the value grants access and no gating limit is exhausted.
    pub enabled: bool,
    /// Gating limits with nothing remaining this cycle.
    pub exhausted_limits: Vec<String>,
}
