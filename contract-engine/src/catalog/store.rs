//! Pricing catalog collaborator.
//!
//! The engine only reads pricing versions; publishing and archiving belong
//! to whoever owns the catalog. [`InMemoryCatalog`] is the bundled
//! implementation, used by the server binary and the tests.

use std::{
    collections::BTreeMap,
    fmt,
    sync::{Arc, RwLock},
};

use serde::Serialize;

use super::models::{PricingVersion, PricingVersionRef};
use crate::error::{EngineError, ResourceKind, Result};

/// Publication status of a pricing version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionStatus {
    /// Offered for new contracts.
    Active,
    /// Retained for contracts already bound to it, not offered to new ones.
    Archived,
}

/// Read-only view of published pricing versions.
///
/// Implementations must return the same content for a reference on every
/// call: pricing versions are immutable once published.
pub trait PricingCatalog: Send + Sync + fmt::Debug {
    /// Fetches a pricing version.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] with [`ResourceKind::PricingVersion`]
    /// if the reference is unknown.
    fn pricing_version(
        &self,
        reference: &PricingVersionRef,
    ) -> impl Future<Output = Result<Arc<PricingVersion>>> + Send;

    /// Returns whether a version is active or archived.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] if the reference is unknown.
    fn status(
        &self,
        reference: &PricingVersionRef,
    ) -> impl Future<Output = Result<VersionStatus>> + Send;
}

#[derive(Debug)]
struct CatalogEntry {
    pricing: Arc<PricingVersion>,
    status: VersionStatus,
}

/// In-process pricing catalog.
///
/// # Examples
///
/// ```
/// use contract_engine::catalog::{InMemoryCatalog, VersionStatus};
///
/// let catalog = InMemoryCatalog::new();
/// let reference = catalog
///     .publish_json(
///         r#"{
///         "service": "petclinic", "version": "v1", "currency": "EUR",
///         "created_at": "2024-01-01T00:00:00Z",
///         "plans": { "free": {} }
///     }"#,
///     )
///     .unwrap();
///
/// assert_eq!(reference.to_string(), "petclinic@v1");
/// catalog.archive(&reference).unwrap();
/// assert_eq!(catalog.versions("petclinic"), vec![(reference, VersionStatus::Archived)]);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    entries: RwLock<BTreeMap<PricingVersionRef, CatalogEntry>>,
}

impl InMemoryCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and publishes a pricing version.
    ///
    /// Publishing identical content twice is a no-op; publishing different
    /// content under an existing reference is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidCatalog`] if validation fails or the
    /// reference is already taken by different content.
    pub fn publish(&self, pricing: PricingVersion) -> Result<PricingVersionRef> {
        pricing.validate()?;
        let reference = pricing.reference();

        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        if let Some(existing) = entries.get(&reference) {
            if *existing.pricing == pricing {
                return Ok(reference);
            }
            return Err(EngineError::InvalidCatalog(format!(
                "{reference} is already published with different content"
            )));
        }

        tracing::info!(pricing = %reference, plans = pricing.plans.len(), "Published pricing version");
        entries.insert(
            reference.clone(),
            CatalogEntry { pricing: Arc::new(pricing), status: VersionStatus::Active },
        );
        Ok(reference)
    }

    /// Parses a JSON pricing document and publishes it.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidCatalog`] if the document does not parse
    /// or the version is rejected by [`InMemoryCatalog::publish`].
    pub fn publish_json(&self, document: &str) -> Result<PricingVersionRef> {
        let pricing: PricingVersion = serde_json::from_str(document)
            .map_err(|e| EngineError::InvalidCatalog(format!("malformed pricing document: {e}")))?;
        self.publish(pricing)
    }

    /// Marks a version archived.
    ///
    /// Archived versions stay resolvable for contracts bound to them.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] if the reference is unknown.
    pub fn archive(&self, reference: &PricingVersionRef) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        let entry = entries.get_mut(reference).ok_or_else(|| not_found(reference))?;
        if entry.status != VersionStatus::Archived {
            entry.status = VersionStatus::Archived;
            tracing::info!(pricing = %reference, "Archived pricing version");
        }
        Ok(())
    }

    /// Lists the versions of a service with their status.
    #[must_use]
    pub fn versions(&self, service: &str) -> Vec<(PricingVersionRef, VersionStatus)> {
        self.entries
            .read()
            .map(|entries| {
                entries
                    .iter()
                    .filter(|(reference, _)| reference.service == service)
                    .map(|(reference, entry)| (reference.clone(), entry.status))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of published versions across all services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or_default()
    }

    /// Returns `true` if nothing has been published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup<T>(
        &self,
        reference: &PricingVersionRef,
        project: impl FnOnce(&CatalogEntry) -> T,
    ) -> Result<T> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        entries.get(reference).map(project).ok_or_else(|| not_found(reference))
    }
}

impl PricingCatalog for InMemoryCatalog {
    async fn pricing_version(&self, reference: &PricingVersionRef) -> Result<Arc<PricingVersion>> {
        self.lookup(reference, |entry| Arc::clone(&entry.pricing))
    }

    async fn status(&self, reference: &PricingVersionRef) -> Result<VersionStatus> {
        self.lookup(reference, |entry| entry.status)
    }
}

fn not_found(reference: &PricingVersionRef) -> EngineError {
    EngineError::NotFound { kind: ResourceKind::PricingVersion, id: reference.to_string() }
}

fn poisoned() -> EngineError {
    EngineError::Internal("catalog lock poisoned".to_owned())
}
