//! Contract lifecycle manager.
//!
//! [`ContractManager`] is the entry point for callers. It owns no business
//! rules of its own; it orders the steps of every operation:
//!
//! 1. take the per-contract lock (mutations only)
//! 2. read the contract and resolve its entitlements through the cache
//! 3. apply the pure transition from [`contract`](crate::contract)
//! 4. commit with the revision that was read
//!
//! Steps 2-4 are retried with backoff when the commit loses a race or an
//! entitlement computation times out.
//!
//! # Examples
//!
//! ```
//! use contract_engine::{
//!     catalog::{InMemoryCatalog, PricingVersionRef},
//!     config::EngineConfig,
//!     contract::{ContactInfo, CreateContractParams, InMemoryContractStore, UserId},
//!     manager::ContractManager,
//! };
//! use rust_decimal::Decimal;
//!
//! # async fn example() -> contract_engine::error::Result<()> {
//! let catalog = InMemoryCatalog::new();
//! catalog.publish_json(
//!     r#"{
//!     "service": "petclinic", "version": "2024", "currency": "EUR",
//!     "created_at": "2024-01-01T00:00:00Z",
//!     "usage_limits": {
//!         "apiCalls": {
//!             "value_type": "numeric",
//!             "default_value": {"type": "numeric", "value": 100},
//!             "kind": "RENEWABLE",
//!             "period": {"value": 1, "unit": "months"}
//!         }
//!     },
//!     "plans": { "basic": { "usage_limits": { "apiCalls": null } } }
//! }"#,
//! )?;
//!
//! let manager = ContractManager::new(InMemoryContractStore::new(), catalog, &EngineConfig::default())?;
//! let user = UserId::new("user-1")?;
//! manager
//!     .create_contract(CreateContractParams::new(
//!         user.clone(),
//!         ContactInfo::new("alice"),
//!         PricingVersionRef::new("petclinic", "2024"),
//!         "basic",
//!     ))
//!     .await?;
//!
//! let usage = manager.increment_usage(&user, "apiCalls", Decimal::from(40)).await?;
//! assert_eq!(usage.consumed, Decimal::from(40));
//! # Ok(())
//! # }
//! ```

use std::{collections::BTreeMap, sync::Arc, time::Instant};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{
    catalog::{PricingCatalog, PricingVersionRef, RenewalPeriod, VersionStatus},
    clock::{Clock, SystemClock},
    config::EngineConfig,
    contract::{
        BillingPeriod, BillingPeriodExpiry, BillingPeriodUpdate, ContactInfo, Contract,
        ContractFilter, ContractLocks, ContractPage, ContractStore, CreateContractParams,
        NovationRequest, PruneRule, UsageSnapshot, UsageTracker, UserId, apply_billing_period,
        apply_selection, initial_levels, reset_levels,
    },
    entitlements::{
        CacheStats, EntitlementCache, EntitlementSet, FeatureEvaluation, Fingerprint, evaluate,
    },
    error::{EngineError, Result},
    events::{EventEmitter, NoopEmitter, PricingChangeEvent},
    reliability::{RetryPolicy, retry_with_backoff},
    security::audit::{AuditEvent, AuditEventType, audit_log},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Adjustment {
    Consume,
    Correct,
}

/// Contract lifecycle façade over a contract store and a pricing catalog.
#[derive(Debug)]
pub struct ContractManager<S, C> {
    store: S,
    catalog: Arc<C>,
    cache: EntitlementCache,
    locks: ContractLocks,
    clock: Arc<dyn Clock>,
    emitter: Arc<dyn EventEmitter>,
    prune_rule: Arc<dyn PruneRule>,
    retry: RetryPolicy,
}

impl<S, C> ContractManager<S, C>
where
    S: ContractStore,
    C: PricingCatalog + 'static,
{
    /// Creates a manager with the wall clock, no event delivery and the
    /// billing-period expiry pruning rule.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ConfigError`] if `config` is invalid.
    pub fn new(store: S, catalog: C, config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            catalog: Arc::new(catalog),
            cache: EntitlementCache::new(config.cache_capacity()?, config.compute_timeout()),
            locks: ContractLocks::default(),
            clock: Arc::new(SystemClock),
            emitter: Arc::new(NoopEmitter),
            prune_rule: Arc::new(BillingPeriodExpiry::new(config.grace_period())),
            retry: config.retry_policy(),
        })
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the pricing-change event sink.
    #[must_use]
    pub fn with_emitter(mut self, emitter: Arc<dyn EventEmitter>) -> Self {
        self.emitter = emitter;
        self
    }

    /// Replaces the pruning rule.
    #[must_use]
    pub fn with_prune_rule(mut self, rule: Arc<dyn PruneRule>) -> Self {
        self.prune_rule = rule;
        self
    }

    /// The contract store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// The pricing catalog.
    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    // ========================================================================
    // Creation and queries
    // ========================================================================

    /// Creates a contract bound to an active pricing version.
    ///
    /// Every trackable limit of the selection starts at zero, and the first
    /// billing cycle starts now.
    ///
    /// # Errors
    ///
    /// - [`EngineError::ValidationError`] for invalid contact details or
    ///   billing terms, an archived pricing version, or an existing contract
    /// - [`EngineError::NotFound`] for an unknown pricing version or plan
    /// - [`EngineError::InvalidAddOnSelection`] / [`EngineError::InvalidQuantity`]
    #[instrument(skip_all, fields(user_id = %params.user_id, pricing = %params.pricing, plan = %params.plan))]
    pub async fn create_contract(&self, params: CreateContractParams) -> Result<Contract> {
        let request_id = Uuid::new_v4();
        let started = Instant::now();
        params.contact.validate()?;
        self.require_active(&params.pricing).await?;

        let now = self.clock.now();
        validate_billing(&params.renewal, params.end, now)?;
        let entitlements = self.resolve(&params.pricing, &params.plan, &params.add_ons).await?;

        let contract = Contract {
            user_id: params.user_id,
            contact: params.contact,
            pricing: params.pricing,
            plan: params.plan,
            add_ons: params.add_ons,
            billing_period: BillingPeriod {
                start: now,
                renewal: params.renewal,
                auto_renew: params.auto_renew,
                end: params.end,
            },
            usage_levels: initial_levels(&entitlements, now),
            history: Vec::new(),
            created_at: now,
            updated_at: now,
            revision: 0,
        };
        let contract = self.store.insert(contract).await?;

        info!(limits = contract.usage_levels.len(), "Contract created");
        audit_log(
            &AuditEvent::new(AuditEventType::ContractCreated, contract.user_id.as_str(), request_id)
                .at(now)
                .with_selection(contract.pricing.to_string(), contract.plan.clone())
                .with_add_ons(&contract.add_ons)
                .with_fingerprint(contract.fingerprint().short())
                .with_duration(started.elapsed()),
        );
        Ok(contract)
    }

    /// Returns a contract with renewable levels brought up to date.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] if the user has no contract.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn get_contract(&self, user_id: &UserId) -> Result<Contract> {
        let (contract, _) = self.load_renewed(user_id).await?;
        Ok(contract)
    }

    /// Lists contracts as stored, without renewing them.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ValidationError`] for invalid pagination.
    #[instrument(skip_all)]
    pub async fn list_contracts(&self, filter: &ContractFilter) -> Result<ContractPage> {
        self.store.list(filter).await
    }

    /// Resolved entitlements of a contract.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotFound`] if the user has no contract
    /// - [`EngineError::ComputationTimeout`] if resolution does not finish
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn entitlements(&self, user_id: &UserId) -> Result<Arc<EntitlementSet>> {
        let contract = self.store.get(user_id).await?;
        self.resolve_contract(&contract).await
    }

    /// Whether a feature is usable by the contract right now.
    ///
    /// Renewal is applied to the view used for the check but not persisted.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] for an unknown contract or feature.
    #[instrument(skip_all, fields(user_id = %user_id, feature = %feature))]
    pub async fn evaluate_feature(&self, user_id: &UserId, feature: &str) -> Result<FeatureEvaluation> {
        let mut contract = self.store.get(user_id).await?;
        let entitlements = self.resolve_contract(&contract).await?;
        let tracker = UsageTracker::new(&entitlements, self.clock.now());
        tracker.renew(&mut contract)?;
        tracker.evaluate_feature(&contract, feature)
    }

    /// Current consumption of one limit, after lazy renewal.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotFound`] if the user has no contract
    /// - [`EngineError::LimitNotFound`] if the selection lacks the limit
    /// - [`EngineError::ValidationError`] if the limit is not trackable
    #[instrument(skip_all, fields(user_id = %user_id, limit = %limit))]
    pub async fn current_usage(&self, user_id: &UserId, limit: &str) -> Result<UsageSnapshot> {
        let (contract, entitlements) = self.load_renewed(user_id).await?;
        UsageTracker::new(&entitlements, self.clock.now()).snapshot(&contract, limit)
    }

    /// Consumption of every trackable limit, after lazy renewal.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] if the user has no contract.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn usage_summary(&self, user_id: &UserId) -> Result<BTreeMap<String, UsageSnapshot>> {
        let (contract, entitlements) = self.load_renewed(user_id).await?;
        UsageTracker::new(&entitlements, self.clock.now()).summary(&contract)
    }

    // ========================================================================
    // Usage
    // ========================================================================

    /// Consumes `delta` of a usage limit.
    ///
    /// The ceiling check and the write happen under the contract's lock
    /// against a freshly read revision, so concurrent increments cannot both
    /// pass against a stale consumption.
    ///
    /// # Errors
    ///
    /// - [`EngineError::LimitExceeded`] if the ceiling would be passed
    /// - [`EngineError::InvalidDelta`] for a negative or malformed delta
    /// - [`EngineError::LimitNotFound`] / [`EngineError::ValidationError`] for
    ///   a limit that is absent or not trackable
    #[instrument(skip_all, fields(user_id = %user_id, limit = %limit, delta = %delta))]
    pub async fn increment_usage(
        &self,
        user_id: &UserId,
        limit: &str,
        delta: Decimal,
    ) -> Result<UsageSnapshot> {
        let request_id = Uuid::new_v4();
        self.serialized(user_id, || self.adjust_once(user_id, limit, delta, Adjustment::Consume, request_id))
            .await
    }

    /// Administrative correction of a usage limit by a signed `delta`.
    ///
    /// Negative deltas clamp consumption at zero.
    ///
    /// # Errors
    ///
    /// See [`ContractManager::increment_usage`].
    #[instrument(skip_all, fields(user_id = %user_id, limit = %limit, delta = %delta))]
    pub async fn correct_usage(
        &self,
        user_id: &UserId,
        limit: &str,
        delta: Decimal,
    ) -> Result<UsageSnapshot> {
        let request_id = Uuid::new_v4();
        self.serialized(user_id, || self.adjust_once(user_id, limit, delta, Adjustment::Correct, request_id))
            .await
    }

    /// Resets consumption of the named limits, or of all limits.
    ///
    /// Cycle anchors are kept.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::LimitNotFound`] for a name the contract does not
    /// track; nothing is reset in that case.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn reset_usage_levels(
        &self,
        user_id: &UserId,
        names: Option<&[String]>,
    ) -> Result<Contract> {
        let request_id = Uuid::new_v4();
        self.serialized(user_id, || async move {
            let mut contract = self.store.get(user_id).await?;
            let entitlements = self.resolve_contract(&contract).await?;
            let now = self.clock.now();
            let expected = contract.revision;

            let renewed = UsageTracker::new(&entitlements, now).renew(&mut contract)?;
            let reset = reset_levels(&mut contract, names)?;
            if !renewed && !reset {
                return Ok(contract);
            }
            let contract = self.commit(contract, expected, now).await?;

            audit_log(
                &AuditEvent::new(AuditEventType::UsageLevelsReset, user_id.as_str(), request_id)
                    .at(now)
                    .with_count(names.map_or(contract.usage_levels.len(), <[String]>::len)),
            );
            Ok(contract)
        })
        .await
    }

    // ========================================================================
    // Novation
    // ========================================================================

    /// Changes plan, add-ons and/or pricing version.
    ///
    /// The target selection is validated before anything is written; a
    /// rejected novation leaves the contract untouched. Consumption of limits
    /// that survive the change carries over. A pricing-change event is
    /// emitted when the entitlement fingerprint changes.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidAddOnSelection`] / [`EngineError::InvalidQuantity`]
    /// - [`EngineError::NotFound`] for an unknown plan or pricing version
    /// - [`EngineError::ValidationError`] for an archived target version
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn novate(&self, user_id: &UserId, request: NovationRequest) -> Result<Contract> {
        let request_id = Uuid::new_v4();
        let request = &request;
        let (before, contract) = self
            .serialized(user_id, || async move {
                let mut contract = self.store.get(user_id).await?;
                let before = contract.fingerprint();
                let current = self.resolve_contract(&contract).await?;
                let (pricing, plan, add_ons) = request.target(&contract);
                if pricing != contract.pricing {
                    self.require_active(&pricing).await?;
                }
                let target = self.resolve(&pricing, &plan, &add_ons).await?;

                let now = self.clock.now();
                let expected = contract.revision;
                let renewed = UsageTracker::new(&current, now).renew(&mut contract)?;
                let changed = apply_selection(&mut contract, &target, now);
                if !renewed && !changed {
                    return Ok((before, contract));
                }
                Ok((before, self.commit(contract, expected, now).await?))
            })
            .await?;

        let after = contract.fingerprint();
        if after != before {
            info!(from = before.short(), to = after.short(), plan = %contract.plan, "Contract novated");
            self.emitter.emit(PricingChangeEvent::new(
                &contract.pricing,
                contract.user_id.clone(),
                after.clone(),
                contract.updated_at,
            ));
            audit_log(
                &AuditEvent::new(AuditEventType::ContractNovated, user_id.as_str(), request_id)
                    .at(contract.updated_at)
                    .with_selection(contract.pricing.to_string(), contract.plan.clone())
                    .with_add_ons(&contract.add_ons)
                    .with_fingerprint(after.short()),
            );
        }
        Ok(contract)
    }

    /// Replaces the billing terms, starting a fresh cycle now.
    ///
    /// Every renewable limit is reset; non-renewable limits are untouched.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ValidationError`] for a zero renewal period or
    /// an end not after now.
    #[instrument(skip_all, fields(user_id = %user_id, renewal = %update.renewal))]
    pub async fn novate_billing_period(
        &self,
        user_id: &UserId,
        update: BillingPeriodUpdate,
    ) -> Result<Contract> {
        let request_id = Uuid::new_v4();
        validate_billing(&update.renewal, update.end, self.clock.now())?;
        self.serialized(user_id, || async move {
            let mut contract = self.store.get(user_id).await?;
            let entitlements = self.resolve_contract(&contract).await?;
            let now = self.clock.now();
            let expected = contract.revision;

            apply_billing_period(&mut contract, update, &entitlements, now);
            let contract = self.commit(contract, expected, now).await?;

            audit_log(
                &AuditEvent::new(AuditEventType::BillingPeriodNovated, user_id.as_str(), request_id)
                    .at(now)
                    .with_selection(contract.pricing.to_string(), contract.plan.clone()),
            );
            Ok(contract)
        })
        .await
    }

    /// Replaces contact details. Entitlements and usage are unaffected.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ValidationError`] for invalid contact details.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn novate_user_contact(&self, user_id: &UserId, contact: ContactInfo) -> Result<Contract> {
        let request_id = Uuid::new_v4();
        contact.validate()?;
        let contact = &contact;
        self.serialized(user_id, || async move {
            let mut contract = self.store.get(user_id).await?;
            let now = self.clock.now();
            let expected = contract.revision;
            contract.contact = contact.clone();
            let contract = self.commit(contract, expected, now).await?;

            audit_log(&AuditEvent::new(AuditEventType::ContactUpdated, user_id.as_str(), request_id).at(now));
            Ok(contract)
        })
        .await
    }

    // ========================================================================
    // Removal
    // ========================================================================

    /// Terminates a contract and evicts its cached entitlements.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] if the user has no contract.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn destroy_contract(&self, user_id: &UserId) -> Result<()> {
        let request_id = Uuid::new_v4();
        let _guard = self.locks.lock(user_id).await;
        let contract = self.store.delete(user_id).await?;
        let fingerprint = contract.fingerprint();
        self.cache.evict(&fingerprint);

        info!("Contract destroyed");
        audit_log(
            &AuditEvent::new(AuditEventType::ContractDestroyed, user_id.as_str(), request_id)
                .at(self.clock.now())
                .with_fingerprint(fingerprint.short()),
        );
        Ok(())
    }

    /// Removes every contract the pruning rule marks as expired.
    ///
    /// Returns the number of contracts removed. Each candidate is read again
    /// under its lock, so contracts deleted or renewed concurrently are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Propagates store failures other than a contract already being gone.
    #[instrument(skip_all)]
    pub async fn prune_expired_contracts(&self) -> Result<usize> {
        let request_id = Uuid::new_v4();
        let now = self.clock.now();
        let expired: Vec<Contract> = self
            .store
            .all()
            .await?
            .into_iter()
            .filter(|contract| self.prune_rule.is_expired(contract, now))
            .collect();

        let mut pruned = 0;
        for candidate in expired {
            let user_id = &candidate.user_id;
            let _guard = self.locks.lock(user_id).await;
            let current = match self.store.get(user_id).await {
                Ok(current) => current,
                Err(EngineError::NotFound { .. }) => {
                    debug!(user_id = %user_id, "Contract already removed");
                    continue;
                }
                Err(e) => return Err(e),
            };
            if !self.prune_rule.is_expired(&current, now) {
                debug!(user_id = %user_id, revision = current.revision, "Contract renewed since scan");
                continue;
            }
            match self.store.delete(user_id).await {
                Ok(removed) => {
                    self.cache.evict(&removed.fingerprint());
                    pruned += 1;
                }
                Err(EngineError::NotFound { .. }) => {
                    debug!(user_id = %user_id, "Contract already removed");
                }
                Err(e) => return Err(e),
            }
        }

        if pruned > 0 {
            info!(pruned, "Pruned expired contracts");
        }
        audit_log(&AuditEvent::new(AuditEventType::ContractsPruned, "*", request_id).at(now).with_count(pruned));
        Ok(pruned)
    }

    // ========================================================================
    // Cache control
    // ========================================================================

    /// Evicts every cached entitlement set computed from a pricing version.
    ///
    /// Returns the number of entries evicted, counting computations still in
    /// flight.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ValidationError`] for an empty service or
    /// version.
    #[instrument(skip_all, fields(service = %service, version = %version))]
    pub fn invalidate_pricing_version(&self, service: &str, version: &str) -> Result<usize> {
        if service.trim().is_empty() || version.trim().is_empty() {
            return Err(EngineError::ValidationError(
                "service and version must not be empty".into(),
            ));
        }
        let pricing = PricingVersionRef::new(service, version);
        let evicted = self.cache.evict_pricing_version(&pricing);
        audit_log(
            &AuditEvent::new(AuditEventType::CacheInvalidated, "*", Uuid::new_v4())
                .at(self.clock.now())
                .with_selection(pricing.to_string(), "*")
                .with_count(evicted),
        );
        Ok(evicted)
    }

    /// Evicts one cached entitlement set.
    ///
    /// # Errors
    ///
    /// Currently infallible; the signature leaves room for shared caches.
    pub fn evict_fingerprint(&self, fingerprint: &Fingerprint) -> Result<bool> {
        let evicted = self.cache.evict(fingerprint);
        audit_log(
            &AuditEvent::new(AuditEventType::CacheInvalidated, "*", Uuid::new_v4())
                .at(self.clock.now())
                .with_fingerprint(fingerprint.short())
                .with_count(usize::from(evicted)),
        );
        Ok(evicted)
    }

    /// Entitlement cache counters.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    // ========================================================================
    // Internals
    // ========================================================================

    async fn serialized<T, F, Fut>(&self, user_id: &UserId, attempt: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let _guard = self.locks.lock(user_id).await;
        retry_with_backoff(&self.retry, attempt).await
    }

    async fn adjust_once(
        &self,
        user_id: &UserId,
        limit: &str,
        delta: Decimal,
        adjustment: Adjustment,
        request_id: Uuid,
    ) -> Result<UsageSnapshot> {
        let mut contract = self.store.get(user_id).await?;
        let entitlements = self.resolve_contract(&contract).await?;
        let now = self.clock.now();
        let expected = contract.revision;

        let tracker = UsageTracker::new(&entitlements, now);
        let outcome = match adjustment {
            Adjustment::Consume => tracker.increment(&mut contract, limit, delta),
            Adjustment::Correct => tracker.correct(&mut contract, limit, delta),
        };
        let snapshot = match outcome {
            Ok(snapshot) => snapshot,
            Err(e @ EngineError::LimitExceeded { .. }) => {
                warn!(error = %e, "Usage increment rejected");
                audit_log(
                    &AuditEvent::new(AuditEventType::LimitExceeded, user_id.as_str(), request_id)
                        .at(now)
                        .with_limit(limit)
                        .with_delta(delta)
                        .with_error(e.to_string()),
                );
                return Err(e);
            }
            Err(e) => return Err(e),
        };
        self.commit(contract, expected, now).await?;

        let event_type = match adjustment {
            Adjustment::Consume => AuditEventType::UsageIncremented,
            Adjustment::Correct => AuditEventType::UsageCorrected,
        };
        audit_log(
            &AuditEvent::new(event_type, user_id.as_str(), request_id)
                .at(now)
                .with_limit(limit)
                .with_delta(delta)
                .with_consumed(snapshot.consumed),
        );
        Ok(snapshot)
    }

    async fn load_renewed(&self, user_id: &UserId) -> Result<(Contract, Arc<EntitlementSet>)> {
        let mut contract = self.store.get(user_id).await?;
        let entitlements = self.resolve_contract(&contract).await?;
        let now = self.clock.now();
        let expected = contract.revision;

        if UsageTracker::new(&entitlements, now).renew(&mut contract)? {
            match self.commit(contract.clone(), expected, now).await {
                Ok(committed) => contract = committed,
                Err(EngineError::ConcurrentModification { .. }) => {
                    debug!("Renewal raced with a writer, serving the renewed view");
                }
                Err(e) => return Err(e),
            }
        }
        Ok((contract, entitlements))
    }

    async fn commit(&self, mut contract: Contract, expected: u64, now: DateTime<Utc>) -> Result<Contract> {
        contract.updated_at = now;
        self.store.update(contract, expected).await
    }

    async fn require_active(&self, pricing: &PricingVersionRef) -> Result<()> {
        match self.catalog.status(pricing).await? {
            VersionStatus::Active => Ok(()),
            VersionStatus::Archived => Err(EngineError::ValidationError(format!(
                "pricing version {pricing} is archived"
            ))),
        }
    }

    async fn resolve_contract(&self, contract: &Contract) -> Result<Arc<EntitlementSet>> {
        self.resolve(&contract.pricing, &contract.plan, &contract.add_ons).await
    }

    async fn resolve(
        &self,
        pricing: &PricingVersionRef,
        plan: &str,
        add_ons: &BTreeMap<String, u32>,
    ) -> Result<Arc<EntitlementSet>> {
        let fingerprint = Fingerprint::compute(pricing, plan, add_ons);
        let catalog = Arc::clone(&self.catalog);
        let (reference, plan, add_ons) = (pricing.clone(), plan.to_owned(), add_ons.clone());
        self.cache
            .get_or_compute(&fingerprint, pricing, move || async move {
                let version = catalog.pricing_version(&reference).await?;
                evaluate(&version, &plan, &add_ons)
            })
            .await
    }
}

fn validate_billing(renewal: &RenewalPeriod, end: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Result<()> {
    if renewal.value == 0 {
        return Err(EngineError::ValidationError("renewal period must be positive".into()));
    }
    if let Some(end) = end
        && end <= now
    {
        return Err(EngineError::ValidationError(format!(
            "billing period end {end} is not after its start {now}"
        )));
    }
    Ok(())
}
