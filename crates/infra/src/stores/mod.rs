//! Storage abstractions for the three services.
//!
//! Each service owns one storage boundary behind a trait object: the twin's
//! account/transaction store, the notification store, and the subscription
//! store. The in-memory implementations are the default; the twin store also
//! has a Postgres implementation for persistent deployments.
//!
//! Uniqueness lives **in the store**, not in check-then-insert call sites:
//! the `(transfer_id, account_id)` dedup key and the one-active-subscription
//! rule are enforced under the store's own synchronization, so concurrent
//! callers cannot race past them.

pub mod memory;
pub mod postgres;

use thiserror::Error;

use piggybank_accounts::{Account, Transaction};
use piggybank_core::{AccountId, DomainError, NotificationId, SubscriptionId, TransactionId, TransferId};
use piggybank_notifications::{Notification, NotificationEventType, NotificationSubscription};

pub use memory::{InMemoryNotificationStore, InMemorySubscriptionStore, InMemoryTwinStore};
pub use postgres::PostgresTwinStore;

/// Storage-level error.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint was violated (duplicate natural key).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A domain rule failed while the store applied a change.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The backing storage itself failed (lock poisoned, SQL error, ...).
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Zero-based page request. A size of 0 is normalized to the default of 20.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub size: usize,
}

impl PageRequest {
    pub const DEFAULT_SIZE: usize = 20;

    pub fn new(page: usize, size: usize) -> Self {
        Self {
            page,
            size: if size == 0 { Self::DEFAULT_SIZE } else { size },
        }
    }

    /// Effectively-unpaged request: one page large enough for everything,
    /// while staying within what SQL `LIMIT` accepts.
    pub fn unpaged() -> Self {
        Self::new(0, i32::MAX as usize)
    }

    pub fn offset(&self) -> usize {
        self.page * self.size
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, Self::DEFAULT_SIZE)
    }
}

/// One page of results plus the totals needed to render paging controls.
#[derive(Debug, Clone, PartialEq)]
pub struct PageOf<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub size: usize,
    pub total: usize,
}

pub(crate) fn paginate<T: Clone>(items: &[T], page: PageRequest) -> PageOf<T> {
    let total = items.len();
    let items = items
        .iter()
        .skip(page.offset())
        .take(page.size)
        .cloned()
        .collect();
    PageOf {
        items,
        page: page.page,
        size: page.size,
        total,
    }
}

/// Result of applying one ledger entry to an account.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedTransaction {
    pub transaction: Transaction,
    pub account: Account,
    /// True when the entry already existed and nothing changed.
    pub replayed: bool,
}

/// The account twin's storage boundary: accounts + their ledger entries.
pub trait TwinStore: Send + Sync {
    /// Persist a new account. Fails with `Conflict` if one with the same
    /// natural key already exists.
    fn insert_account(&self, account: Account) -> Result<Account, StoreError>;

    fn account(&self, id: &AccountId) -> Result<Option<Account>, StoreError>;

    fn account_by_natural_key(
        &self,
        account_type: &str,
        identifier: &str,
    ) -> Result<Option<Account>, StoreError>;

    fn accounts(&self) -> Result<Vec<Account>, StoreError>;

    /// Delete the account and all of its transactions (transactions first).
    /// Returns the deleted account, or `None` if it did not exist.
    fn delete_account(&self, id: &AccountId) -> Result<Option<Account>, StoreError>;

    /// Persist a ledger entry without touching any balance (the DUMMY
    /// opening entry). Fails with `Conflict` on a duplicate dedup key.
    fn insert_transaction(&self, transaction: Transaction) -> Result<Transaction, StoreError>;

    fn transaction(&self, id: &TransactionId) -> Result<Option<Transaction>, StoreError>;

    fn transaction_for_transfer(
        &self,
        transfer_id: &TransferId,
        account_id: &AccountId,
    ) -> Result<Option<Transaction>, StoreError>;

    fn transactions_by_account(
        &self,
        id: &AccountId,
        page: PageRequest,
    ) -> Result<PageOf<Transaction>, StoreError>;

    /// Apply one ledger entry atomically: persist the entry, replace the
    /// account's balance, all serialized per account. Replaying the same
    /// `(transfer_id, account_id)` returns the stored entry untouched.
    fn apply_transaction(&self, transaction: Transaction) -> Result<AppliedTransaction, StoreError>;
}

/// Filter for notification queries.
#[derive(Debug, Clone, Default)]
pub struct NotificationFilter {
    pub account_id: Option<AccountId>,
    pub unread_only: bool,
}

pub trait NotificationStore: Send + Sync {
    fn insert(&self, notification: Notification) -> Result<Notification, StoreError>;

    fn get(&self, id: &NotificationId) -> Result<Option<Notification>, StoreError>;

    /// Page through notifications, newest first.
    fn page(
        &self,
        filter: NotificationFilter,
        page: PageRequest,
    ) -> Result<PageOf<Notification>, StoreError>;

    /// Flip the read flag. Returns the stored (read) notification, or `None`
    /// if the id is unknown. Marking twice is a no-op.
    fn mark_read(&self, id: &NotificationId) -> Result<Option<Notification>, StoreError>;

    fn count_unread(&self) -> Result<usize, StoreError>;
}

/// Outcome of a subscription create: either a fresh row or the active row
/// that already covered the `(account, event type)` pair.
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptionCreate {
    Created(NotificationSubscription),
    Existing(NotificationSubscription),
}

impl SubscriptionCreate {
    pub fn into_subscription(self) -> NotificationSubscription {
        match self {
            SubscriptionCreate::Created(s) | SubscriptionCreate::Existing(s) => s,
        }
    }
}

pub trait SubscriptionStore: Send + Sync {
    /// Create an active subscription, or return the existing active one for
    /// the same `(account, event type)` - at most one can be active.
    fn create(
        &self,
        account_id: AccountId,
        event_type: NotificationEventType,
    ) -> Result<SubscriptionCreate, StoreError>;

    /// Soft-delete. Returns false if the id is unknown.
    fn deactivate(&self, id: &SubscriptionId) -> Result<bool, StoreError>;

    fn active(&self) -> Result<Vec<NotificationSubscription>, StoreError>;

    fn active_for_account(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<NotificationSubscription>, StoreError>;

    fn active_for(
        &self,
        account_id: &AccountId,
        event_type: NotificationEventType,
    ) -> Result<Vec<NotificationSubscription>, StoreError>;
}
