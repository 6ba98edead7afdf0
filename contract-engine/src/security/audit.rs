//! Audit logging for contract mutations.
//!
//! Provides structured audit logging with user-id redaction and unique
//! correlation IDs for tracking one manager call across its log lines.

use std::{collections::BTreeMap, time::Duration};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Types of auditable events.
///
/// Each variant is a change to contract state, or to cached entitlements,
/// that should be traceable after the fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    /// A contract was created.
    ContractCreated,
    /// A contract was terminated.
    ContractDestroyed,
    /// Plan, add-ons or pricing version changed.
    ContractNovated,
    /// Billing terms changed.
    BillingPeriodNovated,
    /// Contact details changed.
    ContactUpdated,
    /// Usage was consumed.
    UsageIncremented,
    /// Usage was administratively corrected.
    UsageCorrected,
    /// A usage increment was rejected at the ceiling.
    LimitExceeded,
    /// Usage levels were reset outside their cycle.
    UsageLevelsReset,
    /// Expired contracts were removed.
    ContractsPruned,
    /// Cached entitlement sets were evicted on request.
    CacheInvalidated,
}

/// Details for an audit log entry.
///
/// Only the fields relevant to the event are set; the rest are skipped when
/// serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditDetails {
    /// Pricing version in force after the event (`service@version`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pricing: Option<String>,
    /// Plan in force after the event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    /// Add-on selection after the event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_ons: Option<BTreeMap<String, u32>>,
    /// Usage limit involved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<String>,
    /// Requested usage delta.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<String>,
    /// Consumption after the event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumed: Option<String>,
    /// Entitlement fingerprint (shortened).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    /// Number of affected items (pruned contracts, evicted entries).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    /// Error message (contact emails redacted).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Duration of the operation in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// Audit log entry.
///
/// # Examples
///
/// ```
/// use contract_engine::security::audit::{AuditEvent, AuditEventType};
/// use uuid::Uuid;
///
/// let event = AuditEvent::new(AuditEventType::UsageIncremented, "user-1234567890", Uuid::new_v4())
///     .with_limit("apiCalls")
///     .with_delta("5")
///     .with_consumed("105");
///
/// assert_eq!(event.user_id, "user-******7890");
/// contract_engine::security::audit::audit_log(&event);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// When the event occurred, by the engine's clock.
    pub timestamp: DateTime<Utc>,
    /// What happened.
    pub event_type: AuditEventType,
    /// Redacted owner of the contract; `*` for bulk events.
    pub user_id: String,
    /// Correlation ID of the manager call.
    pub request_id: Uuid,
    /// Event details.
    pub details: AuditDetails,
}

impl AuditEvent {
    /// Creates an event stamped with the wall clock.
    ///
    /// `user_id` is redacted with [`redact_user_id`].
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl AsRef<str> is idiomatic for builder methods"
    )]
    pub fn new(event_type: AuditEventType, user_id: impl AsRef<str>, request_id: Uuid) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type,
            user_id: redact_user_id(user_id.as_ref()),
            request_id,
            details: AuditDetails::default(),
        }
    }

    /// Overrides the timestamp, for callers with an injected clock.
    #[must_use]
    pub const fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Adds the pricing version and plan to details.
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for builder methods"
    )]
    pub fn with_selection(mut self, pricing: impl Into<String>, plan: impl Into<String>) -> Self {
        self.details.pricing = Some(pricing.into());
        self.details.plan = Some(plan.into());
        self
    }

    /// Adds the add-on selection to details.
    #[must_use]
    pub fn with_add_ons(mut self, add_ons: &BTreeMap<String, u32>) -> Self {
        self.details.add_ons = Some(add_ons.clone());
        self
    }

    /// Adds the usage limit name to details.
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for builder methods"
    )]
    pub fn with_limit(mut self, limit: impl Into<String>) -> Self {
        self.details.limit = Some(limit.into());
        self
    }

    /// Adds the requested delta to details.
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl ToString covers decimals and string literals alike"
    )]
    pub fn with_delta(mut self, delta: impl ToString) -> Self {
        self.details.delta = Some(delta.to_string());
        self
    }

    /// Adds the resulting consumption to details.
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl ToString covers decimals and string literals alike"
    )]
    pub fn with_consumed(mut self, consumed: impl ToString) -> Self {
        self.details.consumed = Some(consumed.to_string());
        self
    }

    /// Adds an entitlement fingerprint to details.
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for builder methods"
    )]
    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.details.fingerprint = Some(fingerprint.into());
        self
    }

    /// Adds an affected-item count to details.
    #[must_use]
    pub const fn with_count(mut self, count: usize) -> Self {
        self.details.count = Some(count);
        self
    }

    /// Adds an error message to details, redacting contact emails.
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for builder methods"
    )]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.details.error = Some(redact_sensitive(&error.into()));
        self
    }

    /// Adds duration to details.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        reason = "duration in ms fits u64 for practical values"
    )]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.details.duration_ms = Some(duration.as_millis() as u64);
        self
    }
}

/// Logs an audit event to tracing with target "audit".
///
/// The dedicated target lets subscribers route audit lines separately from
/// operational logs.
pub fn audit_log(event: &AuditEvent) {
    tracing::info!(
        target: "audit",
        timestamp = %event.timestamp,
        event_type = ?event.event_type,
        user_id = %event.user_id,
        request_id = %event.request_id,
        details = ?event.details,
        "AUDIT"
    );
}

/// Masks the local part of email addresses in free text.
///
/// Contact details end up in validation messages; only the first character
/// of the local part and the domain survive.
///
/// # Examples
///
/// ```
/// use contract_engine::security::audit::redact_sensitive;
///
/// assert_eq!(
///     redact_sensitive("invalid contact 'alice.smith@example.com'"),
///     "invalid contact 'a***@example.com'"
/// );
/// assert_eq!(redact_sensitive("no addresses here"), "no addresses here");
/// ```
#[must_use]
pub fn redact_sensitive(input: &str) -> String {
    input
        .split_inclusive(char::is_whitespace)
        .map(|piece| {
            let word = piece.trim_end_matches(char::is_whitespace);
            let trailing = &piece[word.len()..];
            let start = word.find(|c: char| c.is_ascii_alphanumeric()).unwrap_or(word.len());
            let end = word.rfind(|c: char| c.is_ascii_alphanumeric()).map_or(start, |i| i + 1);
            let core = &word[start..end.max(start)];
            match mask_email(core) {
                Some(masked) => format!("{}{masked}{}{trailing}", &word[..start], &word[end.max(start)..]),
                None => piece.to_owned(),
            }
        })
        .collect()
}

fn mask_email(candidate: &str) -> Option<String> {
    let (local, domain) = candidate.split_once('@')?;
    let first = local.chars().next()?;
    let dot = domain.find('.')?;
    if dot == 0 || domain.ends_with('.') {
        return None;
    }
    Some(format!("{first}***@{domain}"))
}

/// Redacts a user id to show only its prefix and last 4 characters.
///
/// Keeps enough for correlation without logging full identifiers.
///
/// # Examples
///
/// ```
/// use contract_engine::security::audit::redact_user_id;
///
/// assert_eq!(redact_user_id("user-1234567890"), "user-******7890");
/// assert_eq!(redact_user_id("abc"), "abc");
/// assert_eq!(redact_user_id(""), "");
/// ```
#[must_use]
pub fn redact_user_id(user_id: &str) -> String {
    let chars: Vec<char> = user_id.chars().collect();
    if chars.len() <= 4 {
        return user_id.to_owned();
    }

    let prefix_len = chars
        .iter()
        .position(|c| *c == '-')
        .map(|pos| pos + 1)
        .filter(|len| *len <= chars.len() - 4)
        .unwrap_or(0);
    let prefix: String = chars[..prefix_len].iter().collect();
    let visible_end: String = chars[chars.len() - 4..].iter().collect();
    let redacted_middle = "*".repeat(chars.len() - prefix_len - 4);

    format!("{prefix}{redacted_middle}{visible_end}")
}

/// Convenience macro for audit logging.
///
/// # Examples
///
/// ```
/// use contract_engine::{audit, security::audit::AuditEventType};
/// use uuid::Uuid;
///
/// audit!(AuditEventType::ContractDestroyed, "user-42", Uuid::new_v4());
///
/// audit!(
///     AuditEventType::ContractNovated,
///     "user-42",
///     Uuid::new_v4(),
///     with_selection("petclinic@2024", "pro"),
///     with_fingerprint("3f2a9c01d4e5")
/// );
/// ```
#[macro_export]
macro_rules! audit {
    ($event_type:expr, $user_id:expr, $request_id:expr) => {
        $crate::security::audit::audit_log(
            &$crate::security::audit::AuditEvent::new($event_type, $user_id, $request_id)
        )
    };
    ($event_type:expr, $user_id:expr, $request_id:expr, $($method:ident($($arg:expr),*)),+ $(,)?) => {
        $crate::security::audit::audit_log(
            &$crate::security::audit::AuditEvent::new($event_type, $user_id, $request_id)
                $(.$method($($arg),*))+
        )
    };
}
