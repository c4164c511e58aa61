use std::collections::HashMap;
use std::sync::RwLock;

use crate::account_ref::{AccountKey, AccountRef};

/// Process-wide registry of monitored external accounts.
///
/// Constructed once at process start and shared across request handlers.
/// Membership is keyed on `(type, identifier)` - see [`AccountKey`] - so the
/// optional twin-service id never participates in equality. The map's lock is
/// the only synchronization; no further coordination is needed.
#[derive(Debug, Default)]
pub struct MonitoredAccounts {
    inner: RwLock<HashMap<AccountKey, AccountRef>>,
}

impl MonitoredAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a ref. Returns false (and keeps the existing entry untouched)
    /// if an equal ref is already registered.
    pub fn add(&self, account: AccountRef) -> bool {
        let Ok(mut map) = self.inner.write() else {
            return false;
        };
        match map.entry(account.key()) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(account);
                true
            }
        }
    }

    /// Remove a ref by its monitoring identity. Returns false if absent.
    pub fn remove(&self, account: &AccountRef) -> bool {
        let Ok(mut map) = self.inner.write() else {
            return false;
        };
        map.remove(&account.key()).is_some()
    }

    /// Membership lookup by `(type, identifier)` only.
    pub fn is_monitored(&self, account: &AccountRef) -> bool {
        match self.inner.read() {
            Ok(map) => map.contains_key(&account.key()),
            Err(_) => false,
        }
    }

    /// Snapshot of all registered refs.
    pub fn list(&self) -> Vec<AccountRef> {
        match self.inner.read() {
            Ok(map) => map.values().cloned().collect(),
            Err(_) => vec![],
        }
    }
}
