//! Pricing catalog data model.
//!
//! A [`PricingVersion`] is the immutable, published description of what a
//! service sells: features, usage limits, plans and add-ons. Values carried
//! by features and limits are a closed [`Value`] union validated once, when
//! the version enters the catalog, so the evaluator never sees a value whose
//! shape disagrees with its declaration.

use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Datelike, Duration, Months, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{EngineError, ResourceKind, Result};

// ============================================================================
// Values
// ============================================================================

/// Numeric ceiling or amount that may be unbounded.
///
/// Deserializes from a number, a decimal string, or one of the keywords
/// `"unbounded"`, `"infinity"`, `"inf"` (case-insensitive). Serializes finite
/// values as decimal strings and the unbounded value as `"unbounded"`.
///
/// # Examples
///
/// ```
/// use contract_engine::catalog::Quantity;
/// use rust_decimal::Decimal;
///
/// let ceiling = Quantity::Finite(Decimal::from(100));
/// assert!(ceiling.allows(Decimal::from(100)));
/// assert!(!ceiling.allows(Decimal::from(101)));
/// assert!(Quantity::Unbounded.allows(Decimal::MAX));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantity {
    /// A finite amount.
    Finite(Decimal),
    /// No upper bound.
    Unbounded,
}

impl Quantity {
    /// Returns `true` if `total` does not exceed this ceiling.
    #[must_use]
    pub fn allows(&self, total: Decimal) -> bool {
        match self {
            Self::Finite(ceiling) => total <= *ceiling,
            Self::Unbounded => true,
        }
    }

    /// Adds a finite delta. Unbounded stays unbounded.
    #[must_use]
    pub fn checked_add(&self, delta: Decimal) -> Option<Self> {
        match self {
            Self::Finite(value) => value.checked_add(delta).map(Self::Finite),
            Self::Unbounded => Some(Self::Unbounded),
        }
    }

    /// Returns what is left of this ceiling after `consumed`, never negative.
    #[must_use]
    pub fn remaining(&self, consumed: Decimal) -> Self {
        match self {
            Self::Finite(ceiling) => Self::Finite((*ceiling - consumed).max(Decimal::ZERO)),
            Self::Unbounded => Self::Unbounded,
        }
    }

    /// Returns `true` for an unbounded or strictly positive amount.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        match self {
            Self::Finite(value) => value.is_sign_positive() && !value.is_zero(),
            Self::Unbounded => true,
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finite(value) => write!(f, "{value}"),
            Self::Unbounded => f.write_str("unbounded"),
        }
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Finite(value) => Serialize::serialize(value, serializer),
            Self::Unbounded => serializer.serialize_str("unbounded"),
        }
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Finite(Decimal),
            Keyword(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Finite(value) => Ok(Self::Finite(value)),
            Repr::Keyword(word) => match word.to_ascii_lowercase().as_str() {
                "unbounded" | "infinity" | "inf" => Ok(Self::Unbounded),
                other => Err(serde::de::Error::custom(format!(
                    "expected a decimal or 'unbounded', got '{other}'"
                ))),
            },
        }
    }
}

/// Declared type of a feature or usage-limit value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// On/off flag.
    Boolean,
    /// Free-form text (features only).
    Text,
    /// Numeric amount, possibly unbounded.
    Numeric,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Boolean => "boolean",
            Self::Text => "text",
            Self::Numeric => "numeric",
        })
    }
}

/// Value granted for a feature or usage limit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// On/off flag.
    Boolean(bool),
    /// Text value such as a support tier.
    Text(String),
    /// Numeric amount.
    Numeric(Quantity),
}

impl Value {
    /// Shorthand for a finite numeric value.
    #[must_use]
    pub fn numeric(value: impl Into<Decimal>) -> Self {
        Self::Numeric(Quantity::Finite(value.into()))
    }

    /// Returns the declared type this value satisfies.
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        match self {
            Self::Boolean(_) => ValueType::Boolean,
            Self::Text(_) => ValueType::Text,
            Self::Numeric(_) => ValueType::Numeric,
        }
    }

    /// Returns `true` when the value grants access.
    ///
    /// Booleans grant when `true`, numbers when positive or unbounded, text
    /// when non-empty.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        match self {
            Self::Boolean(flag) => *flag,
            Self::Text(text) => !text.is_empty(),
            Self::Numeric(quantity) => quantity.is_positive(),
        }
    }

    /// Returns the numeric amount, if this is a numeric value.
    #[must_use]
    pub const fn as_quantity(&self) -> Option<Quantity> {
        match self {
            Self::Numeric(quantity) => Some(*quantity),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(flag) => write!(f, "{flag}"),
            Self::Text(text) => f.write_str(text),
            Self::Numeric(quantity) => write!(f, "{quantity}"),
        }
    }
}

// ============================================================================
// Renewal periods
// ============================================================================

/// Unit of a [`RenewalPeriod`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodUnit {
    /// Seconds.
    Seconds,
    /// Minutes.
    Minutes,
    /// Hours.
    Hours,
    /// Days.
    Days,
    /// Calendar months.
    Months,
    /// Calendar years.
    Years,
}

impl PeriodUnit {
    /// Fixed length in seconds; `None` for calendar units.
    const fn seconds(self) -> Option<i64> {
        match self {
            Self::Seconds => Some(1),
            Self::Minutes => Some(60),
            Self::Hours => Some(3_600),
            Self::Days => Some(86_400),
            Self::Months | Self::Years => None,
        }
    }

    const fn months(self) -> u32 {
        match self {
            Self::Years => 12,
            _ => 1,
        }
    }
}

/// Length of a renewal cycle, e.g. "1 month" or "30 days".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenewalPeriod {
    /// Number of units per cycle; must be non-zero.
    pub value: u32,
    /// Unit of the cycle.
    pub unit: PeriodUnit,
}

impl RenewalPeriod {
    /// Creates a renewal period.
    #[must_use]
    pub const fn new(value: u32, unit: PeriodUnit) -> Self {
        Self { value, unit }
    }

    /// One calendar month.
    #[must_use]
    pub const fn monthly() -> Self {
        Self::new(1, PeriodUnit::Months)
    }

    /// Returns `start` advanced by `cycles` whole periods.
    ///
    /// Returns `None` on overflow.
    #[must_use]
    pub fn advance(&self, start: DateTime<Utc>, cycles: u32) -> Option<DateTime<Utc>> {
        match self.unit.seconds() {
            Some(unit_secs) => {
                let secs = i64::from(self.value)
                    .checked_mul(unit_secs)?
                    .checked_mul(i64::from(cycles))?;
                start.checked_add_signed(Duration::try_seconds(secs)?)
            }
            None => {
                let months = self.value.checked_mul(self.unit.months())?.checked_mul(cycles)?;
                start.checked_add_months(Months::new(months))
            }
        }
    }

    /// Returns the start of the cycle containing `now`, counting whole
    /// cycles from `start`.
    ///
    /// The result is always `start + k * period` for some `k >= 0`, so
    /// repeated missed renewals never drift towards `now`. If `now` precedes
    /// the end of the first cycle, `start` itself is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{TimeZone, Utc};
    /// use contract_engine::catalog::RenewalPeriod;
    ///
    /// let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    /// let now = Utc.with_ymd_and_hms(2024, 4, 7, 0, 0, 0).unwrap();
    /// let current = RenewalPeriod::monthly().current_cycle_start(start, now).unwrap();
    /// assert_eq!(current, Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap());
    /// ```
    #[must_use]
    pub fn current_cycle_start(
        &self,
        start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        self.advance(start, self.elapsed_cycles(start, now)?)
    }

    /// Returns the start of the cycle after the one containing `now`.
    ///
    /// Like [`current_cycle_start`](Self::current_cycle_start), the boundary
    /// is counted from `start`, so a cycle anchored on the 31st ends on the
    /// 31st whenever the month has one.
    #[must_use]
    pub fn next_cycle_start(&self, start: DateTime<Utc>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.advance(start, self.elapsed_cycles(start, now)?.checked_add(1)?)
    }

    /// Whole cycles between `start` and `now`.
    fn elapsed_cycles(&self, start: DateTime<Utc>, now: DateTime<Utc>) -> Option<u32> {
        if now <= start || self.value == 0 {
            return Some(0);
        }

        match self.unit.seconds() {
            Some(unit_secs) => {
                let period = i64::from(self.value).checked_mul(unit_secs)?;
                u32::try_from((now - start).num_seconds() / period).ok()
            }
            None => {
                let period_months = self.value.checked_mul(self.unit.months())?;
                let months_between = (now.year() - start.year()) * 12
                    + i32::try_from(now.month()).ok()?
                    - i32::try_from(start.month()).ok()?;
                let mut cycles = u32::try_from(months_between.max(0)).ok()? / period_months;
                // Month-end clamping can overshoot by one cycle.
                loop {
                    let candidate = self.advance(start, cycles)?;
                    if candidate <= now || cycles == 0 {
                        return Some(cycles);
                    }
                    cycles -= 1;
                }
            }
        }
    }
}

impl fmt::Display for RenewalPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = match self.unit {
            PeriodUnit::Seconds => "second",
            PeriodUnit::Minutes => "minute",
            PeriodUnit::Hours => "hour",
            PeriodUnit::Days => "day",
            PeriodUnit::Months => "month",
            PeriodUnit::Years => "year",
        };
        if self.value == 1 {
            write!(f, "1 {unit}")
        } else {
            write!(f, "{} {unit}s", self.value)
        }
    }
}

// ============================================================================
// Catalog entities
// ============================================================================

/// Whether consumption of a limit resets periodically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LimitKind {
    /// Consumption resets to zero at every period boundary.
    Renewable,
    /// Consumption accumulates for the life of the contract.
    NonRenewable,
}

/// Feature definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Declared value type.
    pub value_type: ValueType,
    /// Value granted when neither plan nor add-on sets one.
    pub default_value: Value,
}

/// Usage limit definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageLimit {
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Declared value type (boolean or numeric).
    pub value_type: ValueType,
    /// Ceiling used when a plan declares the limit without a value.
    pub default_value: Value,
    /// Renewal behaviour.
    pub kind: LimitKind,
    /// Renewal cycle; renewable limits without one follow the contract's
    /// billing period.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<RenewalPeriod>,
    /// Features gated by this limit.
    #[serde(default)]
    pub linked_features: Vec<String>,
    /// Whether consumption is tracked per contract.
    #[serde(default = "default_true")]
    pub trackable: bool,
    /// Display unit ("requests", "seats").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// Plan definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Price per billing period, in the version currency.
    #[serde(default)]
    pub price: Decimal,
    /// Feature values overriding version defaults.
    #[serde(default)]
    pub features: BTreeMap<String, Value>,
    /// Usage limits granted by the plan; `None` takes the version default.
    #[serde(default)]
    pub usage_limits: BTreeMap<String, Option<Value>>,
}

/// Quantity rules for purchasing an add-on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionConstraints {
    /// Minimum purchasable quantity.
    #[serde(default = "default_one")]
    pub min_quantity: u32,
    /// Maximum purchasable quantity (`None` = no maximum).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_quantity: Option<u32>,
    /// Quantities must be `min_quantity + k * quantity_step`.
    #[serde(default = "default_one")]
    pub quantity_step: u32,
}

impl Default for SubscriptionConstraints {
    fn default() -> Self {
        Self { min_quantity: 1, max_quantity: None, quantity_step: 1 }
    }
}

impl SubscriptionConstraints {
    /// Checks a purchased quantity of `add_on` against these constraints.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidQuantity`] when the quantity is below the
    /// minimum, above the maximum, or off the step grid.
    pub fn check(&self, add_on: &str, quantity: u32) -> Result<()> {
        if quantity < self.min_quantity {
            return Err(EngineError::InvalidQuantity(format!(
                "add-on '{add_on}' requires at least {} units, got {quantity}",
                self.min_quantity
            )));
        }
        if let Some(max) = self.max_quantity
            && quantity > max
        {
            return Err(EngineError::InvalidQuantity(format!(
                "add-on '{add_on}' allows at most {max} units, got {quantity}"
            )));
        }
        if self.quantity_step > 1 && (quantity - self.min_quantity) % self.quantity_step != 0 {
            return Err(EngineError::InvalidQuantity(format!(
                "add-on '{add_on}' is sold in steps of {} from {}, got {quantity}",
                self.quantity_step, self.min_quantity
            )));
        }
        Ok(())
    }
}

/// Add-on definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOn {
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Price per unit per billing period.
    #[serde(default)]
    pub price: Decimal,
    /// Plans this add-on can be combined with; empty means every plan.
    #[serde(default)]
    pub available_for: Vec<String>,
    /// Add-ons that must also be selected.
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Add-ons that must not be selected alongside this one.
    #[serde(default)]
    pub excludes: Vec<String>,
    /// Feature values replacing the plan's.
    #[serde(default)]
    pub features: BTreeMap<String, Value>,
    /// Usage-limit values replacing the current ceiling.
    #[serde(default)]
    pub usage_limits: BTreeMap<String, Value>,
    /// Per-unit amounts added to numeric ceilings.
    #[serde(default)]
    pub usage_limits_extensions: BTreeMap<String, Decimal>,
    /// Purchasable quantity rules.
    #[serde(default)]
    pub subscription_constraints: SubscriptionConstraints,
}

impl AddOn {
    /// Returns `true` if the add-on may be combined with `plan`.
    #[must_use]
    pub fn is_available_for(&self, plan: &str) -> bool {
        self.available_for.is_empty() || self.available_for.iter().any(|p| p == plan)
    }
}

/// Identifies one pricing version of one service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PricingVersionRef {
    /// Service name.
    pub service: String,
    /// Version label.
    pub version: String,
}

impl PricingVersionRef {
    /// Creates a reference.
    pub fn new(service: impl Into<String>, version: impl Into<String>) -> Self {
        Self { service: service.into(), version: version.into() }
    }
}

impl fmt::Display for PricingVersionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.service, self.version)
    }
}

/// Immutable published pricing of a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingVersion {
    /// Service name.
    pub service: String,
    /// Version label.
    pub version: String,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Publication timestamp.
    pub created_at: DateTime<Utc>,
    /// Features by name.
    #[serde(default)]
    pub features: BTreeMap<String, Feature>,
    /// Usage limits by name.
    #[serde(default)]
    pub usage_limits: BTreeMap<String, UsageLimit>,
    /// Plans by name.
    pub plans: BTreeMap<String, Plan>,
    /// Add-ons by name.
    #[serde(default)]
    pub add_ons: BTreeMap<String, AddOn>,
}

impl PricingVersion {
    /// Returns the reference identifying this version.
    #[must_use]
    pub fn reference(&self) -> PricingVersionRef {
        PricingVersionRef::new(&self.service, &self.version)
    }

    /// Looks up a plan.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] if the plan does not exist.
    pub fn plan(&self, name: &str) -> Result<&Plan> {
        self.plans.get(name).ok_or_else(|| EngineError::NotFound {
            kind: ResourceKind::Plan,
            id: format!("{name} in {}", self.reference()),
        })
    }

    /// Validates the version at the catalog boundary.
    ///
    /// Checks that every name referenced by plans and add-ons exists, that
    /// every value matches its declared type, that extensions only target
    /// numeric limits, and that periods and quantity constraints are sane.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidCatalog`] describing the first problem.
    pub fn validate(&self) -> Result<()> {
        if self.service.trim().is_empty() || self.version.trim().is_empty() {
            return Err(invalid("service and version must not be empty"));
        }
        if self.currency.trim().is_empty() {
            return Err(invalid("currency must not be empty"));
        }
        if self.plans.is_empty() {
            return Err(invalid(format!("{} declares no plans", self.reference())));
        }

        for (name, feature) in &self.features {
            check_value(&format!("feature '{name}' default"), feature.value_type, &feature.default_value)?;
        }

        for (name, limit) in &self.usage_limits {
            self.validate_limit(name, limit)?;
        }

        for (name, plan) in &self.plans {
            self.validate_plan(name, plan)?;
        }

        for (name, add_on) in &self.add_ons {
            self.validate_add_on(name, add_on)?;
        }

        Ok(())
    }

    fn validate_limit(&self, name: &str, limit: &UsageLimit) -> Result<()> {
        if limit.value_type == ValueType::Text {
            return Err(invalid(format!("usage limit '{name}' cannot be text-valued")));
        }
        check_value(&format!("usage limit '{name}' default"), limit.value_type, &limit.default_value)?;
        match (limit.kind, limit.period) {
            (LimitKind::Renewable, Some(period)) if period.value == 0 => {
                return Err(invalid(format!("usage limit '{name}' has a zero-length period")));
            }
            (LimitKind::NonRenewable, Some(_)) => {
                return Err(invalid(format!(
                    "usage limit '{name}' is non-renewable but declares a period"
                )));
            }
            _ => {}
        }
        for feature in &limit.linked_features {
            if !self.features.contains_key(feature) {
                return Err(invalid(format!(
                    "usage limit '{name}' links unknown feature '{feature}'"
                )));
            }
        }
        Ok(())
    }

    fn validate_plan(&self, name: &str, plan: &Plan) -> Result<()> {
        if plan.price.is_sign_negative() {
            return Err(invalid(format!("plan '{name}' has a negative price")));
        }
        self.validate_feature_values(&format!("plan '{name}'"), &plan.features)?;
        for (limit_name, value) in &plan.usage_limits {
            let limit = self.known_limit(&format!("plan '{name}'"), limit_name)?;
            if let Some(value) = value {
                check_value(&format!("plan '{name}' limit '{limit_name}'"), limit.value_type, value)?;
            }
        }
        Ok(())
    }

    fn validate_add_on(&self, name: &str, add_on: &AddOn) -> Result<()> {
        let context = format!("add-on '{name}'");
        if add_on.price.is_sign_negative() {
            return Err(invalid(format!("{context} has a negative price")));
        }
        for plan in &add_on.available_for {
            if !self.plans.contains_key(plan) {
                return Err(invalid(format!("{context} is available for unknown plan '{plan}'")));
            }
        }
        for other in add_on.depends_on.iter().chain(&add_on.excludes) {
            if other == name {
                return Err(invalid(format!("{context} references itself")));
            }
            if !self.add_ons.contains_key(other) {
                return Err(invalid(format!("{context} references unknown add-on '{other}'")));
            }
        }
        if let Some(conflict) = add_on.depends_on.iter().find(|d| add_on.excludes.contains(d)) {
            return Err(invalid(format!("{context} both depends on and excludes '{conflict}'")));
        }

        self.validate_feature_values(&context, &add_on.features)?;
        for (limit_name, value) in &add_on.usage_limits {
            let limit = self.known_limit(&context, limit_name)?;
            check_value(&format!("{context} limit '{limit_name}'"), limit.value_type, value)?;
        }
        for (limit_name, extension) in &add_on.usage_limits_extensions {
            let limit = self.known_limit(&context, limit_name)?;
            if limit.value_type != ValueType::Numeric {
                return Err(invalid(format!(
                    "{context} extends non-numeric usage limit '{limit_name}'"
                )));
            }
            if extension.is_sign_negative() {
                return Err(invalid(format!(
                    "{context} has a negative extension for '{limit_name}'"
                )));
            }
        }

        let constraints = add_on.subscription_constraints;
        if constraints.min_quantity == 0 || constraints.quantity_step == 0 {
            return Err(invalid(format!("{context} needs min_quantity and quantity_step >= 1")));
        }
        if constraints.max_quantity.is_some_and(|max| max < constraints.min_quantity) {
            return Err(invalid(format!("{context} has max_quantity below min_quantity")));
        }
        Ok(())
    }

    fn validate_feature_values(
        &self,
        context: &str,
        values: &BTreeMap<String, Value>,
    ) -> Result<()> {
        for (feature_name, value) in values {
            let feature = self.features.get(feature_name).ok_or_else(|| {
                invalid(format!("{context} references unknown feature '{feature_name}'"))
            })?;
            check_value(&format!("{context} feature '{feature_name}'"), feature.value_type, value)?;
        }
        Ok(())
    }

    fn known_limit(&self, context: &str, limit_name: &str) -> Result<&UsageLimit> {
        self.usage_limits.get(limit_name).ok_or_else(|| {
            invalid(format!("{context} references unknown usage limit '{limit_name}'"))
        })
    }
}

fn check_value(context: &str, expected: ValueType, value: &Value) -> Result<()> {
    if value.value_type() == expected {
        Ok(())
    } else {
        Err(invalid(format!("{context} is {} but {expected} was declared", value.value_type())))
    }
}

fn invalid(message: impl Into<String>) -> EngineError {
    EngineError::InvalidCatalog(message.into())
}

fn default_true() -> bool {
    true
}

fn default_one() -> u32 {
    1
}
