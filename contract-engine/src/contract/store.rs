//! Contract persistence collaborator.
//!
//! Writers follow optimistic concurrency: read a contract, change it, then
//! [`ContractStore::update`] with the revision that was read. A mismatch
//! means someone else committed in between and the caller must re-read.

use std::{collections::BTreeMap, fmt, sync::RwLock};

use super::models::{Contract, ContractFilter, ContractPage, UserId};
use crate::error::{EngineError, Result};

/// Storage of contracts keyed by user id.
pub trait ContractStore: Send + Sync + fmt::Debug {
    /// Fetches a contract.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] if the user has no contract.
    fn get(&self, user_id: &UserId) -> impl Future<Output = Result<Contract>> + Send;

    /// Stores a new contract, returning it with its initial revision.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ValidationError`] if the user already has one.
    fn insert(&self, contract: Contract) -> impl Future<Output = Result<Contract>> + Send;

    /// Replaces a contract if its stored revision is still
    /// `expected_revision`, returning it with the next revision.
    ///
    /// # Errors
    ///
    /// - [`EngineError::ConcurrentModification`] on a revision mismatch
    /// - [`EngineError::NotFound`] if the contract was deleted
    fn update(
        &self,
        contract: Contract,
        expected_revision: u64,
    ) -> impl Future<Output = Result<Contract>> + Send;

    /// Removes a contract, returning what was stored.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] if the user has no contract.
    fn delete(&self, user_id: &UserId) -> impl Future<Output = Result<Contract>> + Send;

    /// Lists matching contracts ordered by user id.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ValidationError`] for invalid pagination.
    fn list(&self, filter: &ContractFilter) -> impl Future<Output = Result<ContractPage>> + Send;

    /// Every stored contract, ordered by user id.
    ///
    /// # Errors
    ///
    /// Implementation-specific storage failures.
    fn all(&self) -> impl Future<Output = Result<Vec<Contract>>> + Send;
}

/// In-process contract store.
#[derive(Debug, Default)]
pub struct InMemoryContractStore {
    contracts: RwLock<BTreeMap<UserId, Contract>>,
}

impl InMemoryContractStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored contracts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().map_or(0, |contracts| contracts.len())
    }

    /// Returns `true` if no contract is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, BTreeMap<UserId, Contract>>> {
        self.contracts.read().map_err(|_| poisoned())
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, BTreeMap<UserId, Contract>>> {
        self.contracts.write().map_err(|_| poisoned())
    }
}

impl ContractStore for InMemoryContractStore {
    async fn get(&self, user_id: &UserId) -> Result<Contract> {
        self.read()?
            .get(user_id)
            .cloned()
            .ok_or_else(|| EngineError::contract_not_found(user_id.as_str()))
    }

    async fn insert(&self, mut contract: Contract) -> Result<Contract> {
        let mut contracts = self.write()?;
        if contracts.contains_key(&contract.user_id) {
            return Err(EngineError::ValidationError(format!(
                "user {} already has a contract",
                contract.user_id
            )));
        }
        contract.revision = 1;
        contracts.insert(contract.user_id.clone(), contract.clone());
        Ok(contract)
    }

    async fn update(&self, mut contract: Contract, expected_revision: u64) -> Result<Contract> {
        let mut contracts = self.write()?;
        let stored = contracts
            .get_mut(&contract.user_id)
            .ok_or_else(|| EngineError::contract_not_found(contract.user_id.as_str()))?;
        if stored.revision != expected_revision {
            return Err(EngineError::ConcurrentModification {
                user_id: contract.user_id.to_string(),
                expected: expected_revision,
            });
        }
        contract.revision = expected_revision + 1;
        *stored = contract.clone();
        Ok(contract)
    }

    async fn delete(&self, user_id: &UserId) -> Result<Contract> {
        self.write()?
            .remove(user_id)
            .ok_or_else(|| EngineError::contract_not_found(user_id.as_str()))
    }

    async fn list(&self, filter: &ContractFilter) -> Result<ContractPage> {
        filter.validate()?;
        let contracts = self.read()?;
        let matching: Vec<&Contract> = contracts.values().filter(|c| filter.matches(c)).collect();
        Ok(ContractPage {
            total: matching.len(),
            contracts: matching
                .into_iter()
                .skip(filter.offset())
                .take(filter.per_page)
                .cloned()
                .collect(),
            page: filter.page,
            per_page: filter.per_page,
        })
    }

    async fn all(&self) -> Result<Vec<Contract>> {
        Ok(self.read()?.values().cloned().collect())
    }
}

fn poisoned() -> EngineError {
    EngineError::Internal("contract store lock poisoned".into())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::{
        catalog::{PricingVersionRef, RenewalPeriod},
        contract::models::{BillingPeriod, ContactInfo},
    };

    fn contract(user: &str, version: &str, plan: &str) -> Contract {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Contract {
            user_id: UserId::new(user).unwrap(),
            contact: ContactInfo::new(user),
            pricing: PricingVersionRef::new("petclinic", version),
            plan: plan.to_owned(),
            add_ons: BTreeMap::new(),
            billing_period: BillingPeriod::starting(now, RenewalPeriod::monthly()),
            usage_levels: BTreeMap::new(),
            history: Vec::new(),
            created_at: now,
            updated_at: now,
            revision: 0,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = InMemoryContractStore::new();
        let stored = store.insert(contract("alice", "2024", "basic")).await.unwrap();
        assert_eq!(stored.revision, 1);

        let fetched = store.get(&stored.user_id).await.unwrap();
        assert_eq!(fetched, stored);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejected() {
        let store = InMemoryContractStore::new();
        store.insert(contract("alice", "2024", "basic")).await.unwrap();
        let err = store.insert(contract("alice", "2024", "pro")).await.unwrap_err();
        assert!(matches!(err, EngineError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_update_checks_revision() {
        let store = InMemoryContractStore::new();
        let stored = store.insert(contract("alice", "2024", "basic")).await.unwrap();

        let mut first = stored.clone();
        first.plan = "pro".to_owned();
        let committed = store.update(first, stored.revision).await.unwrap();
        assert_eq!(committed.revision, 2);

        // A writer that read revision 1 loses.
        let mut stale = stored.clone();
        stale.plan = "basic".to_owned();
        let err = store.update(stale, stored.revision).await.unwrap_err();
        assert!(matches!(err, EngineError::ConcurrentModification { expected: 1, .. }));
        assert!(err.is_retryable());

        assert_eq!(store.get(&stored.user_id).await.unwrap().plan, "pro");
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_contract() {
        let store = InMemoryContractStore::new();
        let ghost = contract("ghost", "2024", "basic");
        assert!(matches!(store.update(ghost.clone(), 1).await, Err(EngineError::NotFound { .. })));
        assert!(matches!(store.delete(&ghost.user_id).await, Err(EngineError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_delete_removes_contract() {
        let store = InMemoryContractStore::new();
        let stored = store.insert(contract("alice", "2024", "basic")).await.unwrap();
        store.delete(&stored.user_id).await.unwrap();
        assert!(store.is_empty());
        assert!(store.get(&stored.user_id).await.is_err());
    }

    #[tokio::test]
    async fn test_list_filters_and_paginates() {
        let store = InMemoryContractStore::new();
        for (user, version, plan) in [
            ("u1", "2024", "basic"),
            ("u2", "2024", "pro"),
            ("u3", "2025", "basic"),
            ("u4", "2024", "basic"),
            ("u5", "2024", "basic"),
        ] {
            store.insert(contract(user, version, plan)).await.unwrap();
        }

        let filter = ContractFilter {
            version: Some("2024".to_owned()),
            plan: Some("basic".to_owned()),
            per_page: 2,
            ..ContractFilter::service("petclinic")
        };
        let first = store.list(&filter).await.unwrap();
        assert_eq!(first.total, 3);
        let ids: Vec<&str> = first.contracts.iter().map(|c| c.user_id.as_str()).collect();
        assert_eq!(ids, vec!["u1", "u4"]);

        let second = store.list(&ContractFilter { page: 2, ..filter.clone() }).await.unwrap();
        let ids: Vec<&str> = second.contracts.iter().map(|c| c.user_id.as_str()).collect();
        assert_eq!(ids, vec!["u5"]);

        let beyond = store.list(&ContractFilter { page: 9, ..filter }).await.unwrap();
        assert!(beyond.contracts.is_empty());
        assert_eq!(beyond.total, 3);
    }

    #[tokio::test]
    async fn test_list_rejects_bad_pagination() {
        let store = InMemoryContractStore::new();
        let filter = ContractFilter { per_page: 0, ..ContractFilter::default() };
        assert!(matches!(store.list(&filter).await, Err(EngineError::ValidationError(_))));
    }
}
