//! In-memory store implementations.
//!
//! Default for single-process deployments and tests. Every uniqueness rule is
//! checked under the store's write lock, which doubles as the per-account
//! serialization required for balance application.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use piggybank_accounts::{Account, Transaction};
use piggybank_core::{AccountId, DomainError, NotificationId, SubscriptionId, TransactionId, TransferId};
use piggybank_notifications::{Notification, NotificationEventType, NotificationSubscription};

use super::{
    AppliedTransaction, NotificationFilter, PageOf, PageRequest, StoreError, SubscriptionCreate,
    paginate,
};
use super::{NotificationStore, SubscriptionStore, TwinStore};

fn poisoned() -> StoreError {
    StoreError::Backend("lock poisoned".to_string())
}

#[derive(Debug, Default)]
struct TwinState {
    accounts: HashMap<AccountId, Account>,
    /// Insertion-ordered ledger; scanned for lookups (toy scale).
    transactions: Vec<Transaction>,
    /// Dedup index: `(transfer_id, account_id)` -> transaction id.
    by_transfer: HashMap<(TransferId, AccountId), TransactionId>,
}

/// In-memory account/transaction store for the twin service.
#[derive(Debug, Default)]
pub struct InMemoryTwinStore {
    inner: RwLock<TwinState>,
}

impl InMemoryTwinStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, TwinState>, StoreError> {
        self.inner.read().map_err(|_| poisoned())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, TwinState>, StoreError> {
        self.inner.write().map_err(|_| poisoned())
    }
}

impl TwinStore for InMemoryTwinStore {
    fn insert_account(&self, account: Account) -> Result<Account, StoreError> {
        let mut state = self.write()?;
        if state.accounts.contains_key(&account.id) {
            return Err(StoreError::Conflict(format!(
                "account with type {} and identifier {} already exists",
                account.account_type, account.identifier
            )));
        }
        state.accounts.insert(account.id.clone(), account.clone());
        Ok(account)
    }

    fn account(&self, id: &AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.read()?.accounts.get(id).cloned())
    }

    fn account_by_natural_key(
        &self,
        account_type: &str,
        identifier: &str,
    ) -> Result<Option<Account>, StoreError> {
        // The id is derived from the natural key, so this is a plain lookup.
        self.account(&AccountId::derive(account_type, identifier))
    }

    fn accounts(&self) -> Result<Vec<Account>, StoreError> {
        let state = self.read()?;
        let mut accounts: Vec<Account> = state.accounts.values().cloned().collect();
        accounts.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(accounts)
    }

    fn delete_account(&self, id: &AccountId) -> Result<Option<Account>, StoreError> {
        let mut state = self.write()?;
        let Some(account) = state.accounts.remove(id) else {
            return Ok(None);
        };
        state.transactions.retain(|t| &t.account_id != id);
        state.by_transfer.retain(|(_, account_id), _| account_id != id);
        Ok(Some(account))
    }

    fn insert_transaction(&self, transaction: Transaction) -> Result<Transaction, StoreError> {
        let mut state = self.write()?;
        let key = (transaction.transfer_id, transaction.account_id.clone());
        if state.by_transfer.contains_key(&key) {
            return Err(StoreError::Conflict(format!(
                "transaction for transfer {} on account {} already exists",
                transaction.transfer_id, transaction.account_id
            )));
        }
        state.by_transfer.insert(key, transaction.id);
        state.transactions.push(transaction.clone());
        Ok(transaction)
    }

    fn transaction(&self, id: &TransactionId) -> Result<Option<Transaction>, StoreError> {
        let state = self.read()?;
        Ok(state.transactions.iter().find(|t| &t.id == id).cloned())
    }

    fn transaction_for_transfer(
        &self,
        transfer_id: &TransferId,
        account_id: &AccountId,
    ) -> Result<Option<Transaction>, StoreError> {
        let state = self.read()?;
        let Some(id) = state
            .by_transfer
            .get(&(*transfer_id, account_id.clone()))
            .copied()
        else {
            return Ok(None);
        };
        Ok(state.transactions.iter().find(|t| t.id == id).cloned())
    }

    fn transactions_by_account(
        &self,
        id: &AccountId,
        page: PageRequest,
    ) -> Result<PageOf<Transaction>, StoreError> {
        let state = self.read()?;
        let items: Vec<Transaction> = state
            .transactions
            .iter()
            .filter(|t| &t.account_id == id)
            .cloned()
            .collect();
        Ok(paginate(&items, page))
    }

    fn apply_transaction(&self, transaction: Transaction) -> Result<AppliedTransaction, StoreError> {
        // One write lock around read-balance -> compute -> write-balance:
        // this is the per-account serialization the balance contract needs.
        let mut state = self.write()?;

        let key = (transaction.transfer_id, transaction.account_id.clone());
        if let Some(existing_id) = state.by_transfer.get(&key).copied() {
            let existing = state
                .transactions
                .iter()
                .find(|t| t.id == existing_id)
                .cloned()
                .ok_or_else(|| StoreError::Backend("dedup index points at a missing row".into()))?;
            let account = state
                .accounts
                .get(&transaction.account_id)
                .cloned()
                .ok_or_else(|| StoreError::Backend("transaction without its account".into()))?;
            return Ok(AppliedTransaction {
                transaction: existing,
                account,
                replayed: true,
            });
        }

        let account = state.accounts.get(&transaction.account_id).ok_or_else(|| {
            StoreError::Domain(DomainError::validation(format!(
                "account with id {} not found",
                transaction.account_id
            )))
        })?;

        let updated = account.apply(transaction.kind, &transaction.amount)?;

        state.by_transfer.insert(key, transaction.id);
        state.transactions.push(transaction.clone());
        state.accounts.insert(updated.id.clone(), updated.clone());

        Ok(AppliedTransaction {
            transaction,
            account: updated,
            replayed: false,
        })
    }
}

/// In-memory notification store.
#[derive(Debug, Default)]
pub struct InMemoryNotificationStore {
    inner: RwLock<Vec<Notification>>,
}

impl InMemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NotificationStore for InMemoryNotificationStore {
    fn insert(&self, notification: Notification) -> Result<Notification, StoreError> {
        let mut rows = self.inner.write().map_err(|_| poisoned())?;
        rows.push(notification.clone());
        Ok(notification)
    }

    fn get(&self, id: &NotificationId) -> Result<Option<Notification>, StoreError> {
        let rows = self.inner.read().map_err(|_| poisoned())?;
        Ok(rows.iter().find(|n| &n.id == id).cloned())
    }

    fn page(
        &self,
        filter: NotificationFilter,
        page: PageRequest,
    ) -> Result<PageOf<Notification>, StoreError> {
        let rows = self.inner.read().map_err(|_| poisoned())?;
        let items: Vec<Notification> = rows
            .iter()
            .rev() // newest first
            .filter(|n| {
                filter
                    .account_id
                    .as_ref()
                    .is_none_or(|id| &n.account_id == id)
                    && (!filter.unread_only || !n.read)
            })
            .cloned()
            .collect();
        Ok(paginate(&items, page))
    }

    fn mark_read(&self, id: &NotificationId) -> Result<Option<Notification>, StoreError> {
        let mut rows = self.inner.write().map_err(|_| poisoned())?;
        let Some(row) = rows.iter_mut().find(|n| &n.id == id) else {
            return Ok(None);
        };
        *row = row.mark_read();
        Ok(Some(row.clone()))
    }

    fn count_unread(&self) -> Result<usize, StoreError> {
        let rows = self.inner.read().map_err(|_| poisoned())?;
        Ok(rows.iter().filter(|n| !n.read).count())
    }
}

/// In-memory subscription store.
#[derive(Debug, Default)]
pub struct InMemorySubscriptionStore {
    inner: RwLock<Vec<NotificationSubscription>>,
}

impl InMemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SubscriptionStore for InMemorySubscriptionStore {
    fn create(
        &self,
        account_id: AccountId,
        event_type: NotificationEventType,
    ) -> Result<SubscriptionCreate, StoreError> {
        // Check-and-insert under one write lock: at most one active
        // subscription per (account, event type), first writer wins.
        let mut rows = self.inner.write().map_err(|_| poisoned())?;
        if let Some(existing) = rows
            .iter()
            .find(|s| s.active && s.account_id == account_id && s.event_type == event_type)
        {
            return Ok(SubscriptionCreate::Existing(existing.clone()));
        }
        let subscription = NotificationSubscription::create(account_id, event_type);
        rows.push(subscription.clone());
        Ok(SubscriptionCreate::Created(subscription))
    }

    fn deactivate(&self, id: &SubscriptionId) -> Result<bool, StoreError> {
        let mut rows = self.inner.write().map_err(|_| poisoned())?;
        let Some(row) = rows.iter_mut().find(|s| &s.id == id) else {
            return Ok(false);
        };
        *row = row.deactivate();
        Ok(true)
    }

    fn active(&self) -> Result<Vec<NotificationSubscription>, StoreError> {
        let rows = self.inner.read().map_err(|_| poisoned())?;
        Ok(rows.iter().filter(|s| s.active).cloned().collect())
    }

    fn active_for_account(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<NotificationSubscription>, StoreError> {
        let rows = self.inner.read().map_err(|_| poisoned())?;
        Ok(rows
            .iter()
            .filter(|s| s.active && &s.account_id == account_id)
            .cloned()
            .collect())
    }

    fn active_for(
        &self,
        account_id: &AccountId,
        event_type: NotificationEventType,
    ) -> Result<Vec<NotificationSubscription>, StoreError> {
        let rows = self.inner.read().map_err(|_| poisoned())?;
        Ok(rows
            .iter()
            .filter(|s| s.active && &s.account_id == account_id && s.event_type == event_type)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use piggybank_core::{Amount, Currency};
    use rust_decimal::Decimal;
    use std::sync::Arc;

    fn eur(cents: i64) -> Amount {
        Amount::new(Decimal::new(cents, 2), Currency::Eur)
    }

    fn seeded_store() -> (InMemoryTwinStore, Account) {
        let store = InMemoryTwinStore::new();
        let account = Account::create("IBAN", "DE1", eur(10_000)).unwrap();
        store.insert_account(account.clone()).unwrap();
        (store, account)
    }

    fn credit(account: &Account, transfer_id: TransferId, cents: i64) -> Transaction {
        Transaction {
            id: TransactionId::new(),
            transfer_id,
            account_id: account.id.clone(),
            amount: eur(cents),
            valuation_timestamp: Utc::now(),
            purpose: "test".to_string(),
            kind: piggybank_accounts::TransactionType::Credit,
            source_account: None,
            destination_account: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn duplicate_account_insert_conflicts() {
        let (store, account) = seeded_store();
        let err = store.insert_account(account).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn applying_the_same_transfer_leg_twice_changes_the_balance_once() {
        let (store, account) = seeded_store();
        let transfer_id = TransferId::new();

        let first = store
            .apply_transaction(credit(&account, transfer_id, 1_000))
            .unwrap();
        assert!(!first.replayed);
        assert_eq!(first.account.balance, eur(11_000));

        // Same dedup key, different transaction id: must replay, not re-apply.
        let second = store
            .apply_transaction(credit(&account, transfer_id, 1_000))
            .unwrap();
        assert!(second.replayed);
        assert_eq!(second.transaction.id, first.transaction.id);
        assert_eq!(second.account.balance, eur(11_000));
    }

    #[test]
    fn apply_against_a_missing_account_is_a_validation_error() {
        let store = InMemoryTwinStore::new();
        let ghost = Account::create("IBAN", "NOPE", eur(0)).unwrap();
        let err = store
            .apply_transaction(credit(&ghost, TransferId::new(), 100))
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Domain(DomainError::Validation(_))
        ));
    }

    #[test]
    fn concurrent_applies_do_not_lose_updates() {
        let (store, account) = seeded_store();
        let store = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let account = account.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        store
                            .apply_transaction(credit(&account, TransferId::new(), 100))
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let balance = store.account(&account.id).unwrap().unwrap().balance;
        assert_eq!(balance, eur(10_000 + 8 * 25 * 100));
    }

    #[test]
    fn delete_cascades_to_transactions() {
        let (store, account) = seeded_store();
        let applied = store
            .apply_transaction(credit(&account, TransferId::new(), 100))
            .unwrap();

        assert!(store.delete_account(&account.id).unwrap().is_some());
        assert!(store.account(&account.id).unwrap().is_none());
        assert!(store.transaction(&applied.transaction.id).unwrap().is_none());
        assert_eq!(
            store
                .transactions_by_account(&account.id, PageRequest::default())
                .unwrap()
                .total,
            0
        );

        // Second delete reports absence.
        assert!(store.delete_account(&account.id).unwrap().is_none());
    }

    #[test]
    fn transaction_pages_slice_in_insertion_order() {
        let (store, account) = seeded_store();
        for _ in 0..5 {
            store
                .apply_transaction(credit(&account, TransferId::new(), 100))
                .unwrap();
        }

        let page = store
            .transactions_by_account(&account.id, PageRequest::new(1, 2))
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.page, 1);
    }

    #[test]
    fn subscription_create_is_idempotent_per_active_pair() {
        let store = InMemorySubscriptionStore::new();
        let account_id = AccountId::derive("IBAN", "DE1");

        let first = store
            .create(account_id.clone(), NotificationEventType::BalanceUpdate)
            .unwrap();
        let SubscriptionCreate::Created(first) = first else {
            panic!("expected a fresh subscription");
        };

        let second = store
            .create(account_id.clone(), NotificationEventType::BalanceUpdate)
            .unwrap();
        assert_eq!(second, SubscriptionCreate::Existing(first.clone()));

        // Deactivating frees the slot for a new subscription.
        assert!(store.deactivate(&first.id).unwrap());
        let third = store
            .create(account_id, NotificationEventType::BalanceUpdate)
            .unwrap();
        assert!(matches!(third, SubscriptionCreate::Created(_)));
    }

    #[test]
    fn unread_pages_and_counts_track_mark_read() {
        let store = InMemoryNotificationStore::new();
        let account_id = AccountId::derive("IBAN", "DE1");
        let n = store
            .insert(Notification::create(
                account_id.clone(),
                NotificationEventType::BalanceUpdate,
                "hi",
            ))
            .unwrap();
        store
            .insert(Notification::create(
                account_id.clone(),
                NotificationEventType::BalanceUpdate,
                "again",
            ))
            .unwrap();

        assert_eq!(store.count_unread().unwrap(), 2);

        let marked = store.mark_read(&n.id).unwrap().unwrap();
        assert!(marked.read);
        assert_eq!(store.count_unread().unwrap(), 1);

        // Idempotent: marking again changes nothing.
        assert_eq!(store.mark_read(&n.id).unwrap().unwrap(), marked);
        assert_eq!(store.count_unread().unwrap(), 1);

        let unread = store
            .page(
                NotificationFilter {
                    account_id: Some(account_id),
                    unread_only: true,
                },
                PageRequest::default(),
            )
            .unwrap();
        assert_eq!(unread.total, 1);
        assert_eq!(unread.items[0].message, "again");
    }
}
