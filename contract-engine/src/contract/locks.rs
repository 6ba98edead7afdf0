//! Per-contract write serialization.
//!
//! Two-level locking: the outer map lock is held only to look up or insert a
//! contract's mutex; the per-contract mutex is held across the whole
//! read-modify-write. Writers on different contracts never wait on each
//! other. Entries are dropped once nobody holds or waits for them.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::models::UserId;

#[derive(Debug, Default)]
pub(crate) struct ContractLocks {
    locks: Mutex<HashMap<UserId, Arc<AsyncMutex<()>>>>,
}

impl ContractLocks {
    /// Waits for exclusive write access to `user_id`'s contract.
    pub(crate) async fn lock(&self, user_id: &UserId) -> ContractGuard<'_> {
        let mutex = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(user_id.clone()).or_default())
        };
        let guard = mutex.lock_owned().await;
        ContractGuard { registry: self, user_id: user_id.clone(), guard: Some(guard) }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Held while a contract is being modified.
#[derive(Debug)]
pub(crate) struct ContractGuard<'a> {
    registry: &'a ContractLocks,
    user_id: UserId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ContractGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.registry.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks.get(&self.user_id).is_some_and(|mutex| Arc::strong_count(mutex) == 1) {
            locks.remove(&self.user_id);
        }
    }
}
