//! Cache keys for entitlement sets.
//!
//! A fingerprint identifies a (pricing version, plan, add-on selection)
//! combination, not a contract: every contract with the same selection on the
//! same version shares one cached [`EntitlementSet`](super::EntitlementSet).

use std::{collections::BTreeMap, fmt, fmt::Write as _};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::catalog::PricingVersionRef;

/// SHA-256 digest of a canonical selection encoding, as lowercase hex.
///
/// Every field is length-prefixed, so no two distinct selections share an
/// encoding. Add-ons are taken in name order.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
///
/// use contract_engine::{catalog::PricingVersionRef, entitlements::Fingerprint};
///
/// let pricing = PricingVersionRef::new("petclinic", "2024");
/// let add_ons = BTreeMap::from([("extraCalls".to_owned(), 2)]);
///
/// let a = Fingerprint::compute(&pricing, "pro", &add_ons);
/// let b = Fingerprint::compute(&pricing, "pro", &add_ons);
/// assert_eq!(a, b);
/// assert_eq!(a.as_str().len(), 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Computes the fingerprint of a selection.
    #[must_use]
    pub fn compute(pricing: &PricingVersionRef, plan: &str, add_ons: &BTreeMap<String, u32>) -> Self {
        let mut hasher = Sha256::new();
        write_field(&mut hasher, pricing.service.as_bytes());
        write_field(&mut hasher, pricing.version.as_bytes());
        write_field(&mut hasher, plan.as_bytes());
        hasher.update((add_ons.len() as u64).to_be_bytes());
        for (name, quantity) in add_ons {
            write_field(&mut hasher, name.as_bytes());
            hasher.update(quantity.to_be_bytes());
        }

        let digest = hasher.finalize();
        let hex = digest.iter().fold(String::with_capacity(64), |mut out, byte| {
            let _ = write!(out, "{byte:02x}");
            out
        });
        Self(hex)
    }

    /// Returns the hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for logs.
    #[must_use]
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn write_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_be_bytes());
    hasher.update(bytes);
}
