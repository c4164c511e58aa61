//! Service orchestration: stores + bus + clients behind one struct per service.
//!
//! The HTTP routes stay thin; everything that coordinates storage, event
//! publication and the synchronous hops between services lives here, so the
//! same logic is exercised by unit tests without a socket in sight.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;

use piggybank_accounts::{Account, AccountEvent, Transaction, events::ACCOUNTS_TOPIC};
use piggybank_core::{AccountId, Amount, DomainError, NotificationId, SubscriptionId, TransactionId};
use piggybank_events::{Envelope, EventBus, IntegrationEvent, Subscription};
use piggybank_infra::clients::{
    ClientError, IntakeStatus, MonitorRegistration, TransactionIntake, TransactionRequest,
};
use piggybank_infra::stores::{
    AppliedTransaction, NotificationFilter, NotificationStore, PageOf, PageRequest, StoreError,
    SubscriptionStore, TwinStore,
};
use piggybank_notifications::{
    Notification, NotificationEvent, NotificationEventType, NotificationSubscription,
    message::balance_update_message,
};
use piggybank_transfers::{AccountRef, MonitoredAccounts, Transfer, TransferEvent};

/// Failure surfaced by a service operation.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Client-facing domain failure (validation, not found, ...).
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Duplicate natural key.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The requested resource does not exist.
    #[error("not found")]
    NotFound,

    /// A publish or a call to another service failed. Fatal for the
    /// enclosing operation unless the call site is explicitly best-effort.
    #[error("downstream unavailable: {0}")]
    Downstream(String),

    /// Anything else (storage backend failures included).
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(msg) => ServiceError::Conflict(msg),
            StoreError::Domain(e) => ServiceError::Domain(e),
            StoreError::Backend(msg) => ServiceError::Internal(msg),
        }
    }
}

impl From<ClientError> for ServiceError {
    fn from(e: ClientError) -> Self {
        ServiceError::Downstream(e.to_string())
    }
}

/// Type-erased bus handle shared by publishers and consumers.
///
/// The services hold this instead of a concrete bus so the same wiring runs
/// on the in-memory bus (single process, tests) and on Redis pub/sub.
#[derive(Clone)]
pub struct SharedBus {
    inner: Arc<dyn ErasedBus>,
}

trait ErasedBus: Send + Sync {
    fn publish(&self, envelope: Envelope) -> Result<(), String>;
    fn subscribe(&self) -> Subscription<Envelope>;
}

impl<B> ErasedBus for B
where
    B: EventBus<Envelope>,
{
    fn publish(&self, envelope: Envelope) -> Result<(), String> {
        EventBus::publish(self, envelope).map_err(|e| format!("{e:?}"))
    }

    fn subscribe(&self) -> Subscription<Envelope> {
        EventBus::subscribe(self)
    }
}

impl SharedBus {
    pub fn new<B>(bus: B) -> Self
    where
        B: EventBus<Envelope> + 'static,
    {
        Self {
            inner: Arc::new(bus),
        }
    }

    /// Publish a typed event. Synchronous: failures surface to the caller.
    pub fn publish_event<E>(&self, event: &E) -> Result<(), ServiceError>
    where
        E: IntegrationEvent + Serialize,
    {
        let envelope =
            Envelope::from_event(event).map_err(|e| ServiceError::Internal(e.to_string()))?;
        self.inner
            .publish(envelope)
            .map_err(ServiceError::Downstream)
    }

    pub fn subscribe(&self) -> Subscription<Envelope> {
        self.inner.subscribe()
    }
}

// ---------------------------------------------------------------------------
// Account twin
// ---------------------------------------------------------------------------

/// Orchestration for the account-twin service.
pub struct TwinServices {
    store: Arc<dyn TwinStore>,
    bus: SharedBus,
    gateway: Arc<dyn MonitorRegistration>,
}

impl TwinServices {
    pub fn new(
        store: Arc<dyn TwinStore>,
        bus: SharedBus,
        gateway: Arc<dyn MonitorRegistration>,
    ) -> Self {
        Self {
            store,
            bus,
            gateway,
        }
    }

    /// Create a twin account with its opening balance.
    ///
    /// Persists the account and its DUMMY opening entry, publishes
    /// `account.created`, then best-effort registers the account with the
    /// gateway - a registration failure is logged, never surfaced.
    pub async fn create_account(
        &self,
        account_type: &str,
        identifier: &str,
        initial_balance: Amount,
    ) -> Result<Account, ServiceError> {
        let account = Account::create(account_type, identifier, initial_balance)?;
        tracing::info!(account = %account.id, "creating account");

        let account = self.store.insert_account(account)?;
        self.store
            .insert_transaction(Transaction::initial_balance(&account))?;

        self.bus.publish_event(&AccountEvent::created(&account))?;

        match self.gateway.register_account(&account).await {
            Ok(added) => {
                tracing::info!(account = %account.id, added, "registered account with transfer gateway");
            }
            Err(e) => {
                // Account creation must not depend on the gateway being up.
                tracing::error!(account = %account.id, error = %e, "failed to register account with transfer gateway");
            }
        }

        Ok(account)
    }

    pub fn account(&self, id: &AccountId) -> Result<Option<Account>, ServiceError> {
        Ok(self.store.account(id)?)
    }

    pub fn account_by_natural_key(
        &self,
        account_type: &str,
        identifier: &str,
    ) -> Result<Option<Account>, ServiceError> {
        Ok(self.store.account_by_natural_key(account_type, identifier)?)
    }

    pub fn accounts(&self) -> Result<Vec<Account>, ServiceError> {
        Ok(self.store.accounts()?)
    }

    /// Delete an account and its transactions, then publish `account.deleted`.
    /// Returns false when the account does not exist.
    pub fn delete_account(&self, id: &AccountId) -> Result<bool, ServiceError> {
        let Some(account) = self.store.delete_account(id)? else {
            return Ok(false);
        };
        self.bus.publish_event(&AccountEvent::deleted(&account))?;
        Ok(true)
    }

    /// Apply one forwarded ledger entry.
    ///
    /// Idempotent on `(transfer_id, account_id)`: a replay returns the stored
    /// entry and publishes nothing.
    pub fn process_transaction(
        &self,
        request: TransactionRequest,
    ) -> Result<AppliedTransaction, ServiceError> {
        let applied = self.store.apply_transaction(request.into_transaction())?;

        if applied.replayed {
            tracing::info!(
                transaction = %applied.transaction.id,
                "transaction already applied, returning stored entry"
            );
        } else {
            self.bus
                .publish_event(&AccountEvent::updated(&applied.account, &applied.transaction))?;
        }

        Ok(applied)
    }

    pub fn transaction(&self, id: &TransactionId) -> Result<Option<Transaction>, ServiceError> {
        Ok(self.store.transaction(id)?)
    }

    pub fn transactions_by_account(
        &self,
        id: &AccountId,
        page: PageRequest,
    ) -> Result<PageOf<Transaction>, ServiceError> {
        Ok(self.store.transactions_by_account(id, page)?)
    }
}

// ---------------------------------------------------------------------------
// Transfer gateway
// ---------------------------------------------------------------------------

/// How a transfer submission ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Neither side is monitored; successfully handled as a no-op.
    Unmonitored,
    /// The transfer event was published and all legs were forwarded.
    Forwarded { legs: usize },
}

/// Orchestration for the transfer gateway.
pub struct GatewayServices {
    registry: Arc<MonitoredAccounts>,
    bus: SharedBus,
    twin: Arc<dyn TransactionIntake>,
}

impl GatewayServices {
    pub fn new(
        registry: Arc<MonitoredAccounts>,
        bus: SharedBus,
        twin: Arc<dyn TransactionIntake>,
    ) -> Self {
        Self {
            registry,
            bus,
            twin,
        }
    }

    pub fn register(&self, account: AccountRef) -> bool {
        self.registry.add(account)
    }

    pub fn unregister(&self, account: &AccountRef) -> bool {
        self.registry.remove(account)
    }

    pub fn monitored(&self) -> Vec<AccountRef> {
        self.registry.list()
    }

    /// Process one external transfer.
    ///
    /// Publishes the transfer event and forwards one ledger entry per
    /// monitored side. Any failure aborts the operation; a leg that was
    /// already delivered is not rolled back (the leg outcomes are logged so
    /// the inconsistency window is observable).
    pub async fn process_transfer(
        &self,
        transfer: Transfer,
    ) -> Result<TransferOutcome, ServiceError> {
        let source_monitored = self.registry.is_monitored(&transfer.source_account);
        let target_monitored = self.registry.is_monitored(&transfer.target_account);

        if !source_monitored && !target_monitored {
            tracing::info!(
                transfer = %transfer.id,
                "neither source nor target account is monitored, skipping transfer"
            );
            return Ok(TransferOutcome::Unmonitored);
        }

        self.bus
            .publish_event(&TransferEvent::submitted(&transfer))?;

        let legs = transfer.fan_out(source_monitored, target_monitored);
        let total = legs.len();
        for (delivered, leg) in legs.iter().enumerate() {
            let request = TransactionRequest::from_transaction(leg);
            match self.twin.submit_transaction(&request).await {
                Ok(IntakeStatus::Applied) => {
                    tracing::info!(transfer = %transfer.id, leg = %leg.kind, "forwarded transaction to account twin");
                }
                Ok(IntakeStatus::Replayed) => {
                    tracing::info!(transfer = %transfer.id, leg = %leg.kind, "account twin had already applied this leg");
                }
                Err(e) => {
                    tracing::error!(
                        transfer = %transfer.id,
                        leg = %leg.kind,
                        delivered,
                        of = total,
                        error = %e,
                        "failed to forward transaction to account twin"
                    );
                    return Err(e.into());
                }
            }
        }

        Ok(TransferOutcome::Forwarded { legs: total })
    }
}

// ---------------------------------------------------------------------------
// Notification service
// ---------------------------------------------------------------------------

/// Orchestration for the notification service.
pub struct NotificationServices {
    notifications: Arc<dyn NotificationStore>,
    subscriptions: Arc<dyn SubscriptionStore>,
    bus: SharedBus,
    /// Lossy realtime feed for SSE listeners; no backpressure on the core.
    realtime_tx: broadcast::Sender<NotificationEvent>,
}

impl NotificationServices {
    pub fn new(
        notifications: Arc<dyn NotificationStore>,
        subscriptions: Arc<dyn SubscriptionStore>,
        bus: SharedBus,
    ) -> Self {
        let (realtime_tx, _) = broadcast::channel(256);
        Self {
            notifications,
            subscriptions,
            bus,
            realtime_tx,
        }
    }

    /// Background consumer: `account.updated` envelopes -> notifications.
    ///
    /// Decode is strict; a payload missing required fields is logged and
    /// dropped, never requeued.
    pub fn spawn_consumer(self: Arc<Self>) {
        let subscription = self.bus.subscribe();
        let services = self;
        tokio::task::spawn_blocking(move || {
            loop {
                match subscription.recv() {
                    Ok(envelope) => {
                        if envelope.topic() != ACCOUNTS_TOPIC
                            || envelope.routing_key() != "account.updated"
                        {
                            continue;
                        }
                        let event: AccountEvent = match envelope.decode() {
                            Ok(event) => event,
                            Err(e) => {
                                tracing::warn!(error = %e, "dropping undecodable account event");
                                continue;
                            }
                        };
                        if let Err(e) = services.process_account_updated(event) {
                            tracing::error!(error = %e, "failed to process account updated event");
                        }
                    }
                    Err(_) => break,
                }
            }
        });
    }

    /// Turn one account-updated event into at most one stored notification.
    ///
    /// With no active BALANCE_UPDATE subscription for the account, the event
    /// is dropped on purpose. One notification is persisted per event,
    /// independent of how many subscriptions matched.
    pub fn process_account_updated(
        &self,
        event: AccountEvent,
    ) -> Result<Option<Notification>, ServiceError> {
        let AccountEvent::Updated {
            account_id,
            transaction_type,
            transaction_amount,
            transaction_purpose,
            source_account,
            destination_account,
            ..
        } = event
        else {
            return Ok(None);
        };

        let subscriptions = self
            .subscriptions
            .active_for(&account_id, NotificationEventType::BalanceUpdate)?;
        if subscriptions.is_empty() {
            tracing::info!(account = %account_id, "no active subscriptions, dropping account updated event");
            return Ok(None);
        }

        let message = balance_update_message(
            transaction_type,
            &transaction_amount,
            source_account.as_deref(),
            destination_account.as_deref(),
            &transaction_purpose,
        );

        let notification = self.notifications.insert(Notification::create(
            account_id,
            NotificationEventType::BalanceUpdate,
            message,
        ))?;
        self.publish_notification(&notification)?;

        Ok(Some(notification))
    }

    pub fn notifications_page(
        &self,
        filter: NotificationFilter,
        page: PageRequest,
    ) -> Result<PageOf<Notification>, ServiceError> {
        Ok(self.notifications.page(filter, page)?)
    }

    pub fn count_unread(&self) -> Result<usize, ServiceError> {
        Ok(self.notifications.count_unread()?)
    }

    /// Mark a notification read and republish it (`read: true`) so live
    /// listeners reflect the change. Returns false for an unknown id.
    pub fn mark_read(&self, id: &NotificationId) -> Result<bool, ServiceError> {
        let Some(notification) = self.notifications.mark_read(id)? else {
            return Ok(false);
        };
        self.publish_notification(&notification)?;
        Ok(true)
    }

    /// Idempotent create: an active subscription for the same
    /// `(account, event type)` is returned unchanged.
    pub fn create_subscription(
        &self,
        account_id: AccountId,
        event_type: NotificationEventType,
    ) -> Result<NotificationSubscription, ServiceError> {
        let outcome = self.subscriptions.create(account_id, event_type)?;
        Ok(outcome.into_subscription())
    }

    /// Soft-delete. Returns false for an unknown id.
    pub fn deactivate_subscription(&self, id: &SubscriptionId) -> Result<bool, ServiceError> {
        Ok(self.subscriptions.deactivate(id)?)
    }

    pub fn active_subscriptions(&self) -> Result<Vec<NotificationSubscription>, ServiceError> {
        Ok(self.subscriptions.active()?)
    }

    pub fn subscriptions_for_account(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<NotificationSubscription>, ServiceError> {
        Ok(self.subscriptions.active_for_account(account_id)?)
    }

    /// Subscribe to the live notification feed (SSE).
    pub fn subscribe_realtime(&self) -> broadcast::Receiver<NotificationEvent> {
        self.realtime_tx.subscribe()
    }

    fn publish_notification(&self, notification: &Notification) -> Result<(), ServiceError> {
        let event = NotificationEvent::from(notification);
        self.bus.publish_event(&event)?;
        // Lossy; a full channel only means a slow SSE listener misses events.
        let _ = self.realtime_tx.send(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use piggybank_core::{Currency, TransferId};
    use piggybank_infra::stores::{
        InMemoryNotificationStore, InMemorySubscriptionStore, InMemoryTwinStore,
    };
    use piggybank_events::InMemoryEventBus;
    use rust_decimal::Decimal;
    use std::sync::Mutex;

    fn eur(cents: i64) -> Amount {
        Amount::new(Decimal::new(cents, 2), Currency::Eur)
    }

    fn bus() -> SharedBus {
        SharedBus::new(InMemoryEventBus::<Envelope>::new())
    }

    /// Gateway stub recording registrations; optionally failing.
    struct StubGateway {
        fail: bool,
        registered: Mutex<Vec<String>>,
    }

    impl StubGateway {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                fail,
                registered: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl MonitorRegistration for StubGateway {
        async fn register_account(&self, account: &Account) -> Result<bool, ClientError> {
            if self.fail {
                return Err(ClientError::Transport("gateway is down".into()));
            }
            self.registered
                .lock()
                .unwrap()
                .push(account.id.to_string());
            Ok(true)
        }
    }

    /// Twin stub applying requests straight into a twin store.
    struct StubTwin {
        store: Arc<InMemoryTwinStore>,
        fail_on_kind: Option<piggybank_accounts::TransactionType>,
    }

    #[async_trait]
    impl TransactionIntake for StubTwin {
        async fn submit_transaction(
            &self,
            request: &TransactionRequest,
        ) -> Result<IntakeStatus, ClientError> {
            if self.fail_on_kind == Some(request.kind) {
                return Err(ClientError::Transport("twin is down".into()));
            }
            let applied = self
                .store
                .apply_transaction(request.clone().into_transaction())
                .map_err(|e| ClientError::Transport(e.to_string()))?;
            Ok(if applied.replayed {
                IntakeStatus::Replayed
            } else {
                IntakeStatus::Applied
            })
        }
    }

    fn twin_services(gateway: Arc<StubGateway>) -> (TwinServices, Arc<InMemoryTwinStore>) {
        let store = Arc::new(InMemoryTwinStore::new());
        (
            TwinServices::new(store.clone(), bus(), gateway),
            store,
        )
    }

    #[tokio::test]
    async fn create_account_persists_the_opening_entry_and_registers() {
        let gateway = StubGateway::new(false);
        let (twin, store) = twin_services(gateway.clone());

        let account = twin
            .create_account("IBAN", "DE1", eur(10_000))
            .await
            .unwrap();

        let entries = store
            .transactions_by_account(&account.id, PageRequest::default())
            .unwrap();
        assert_eq!(entries.total, 1);
        assert_eq!(
            entries.items[0].kind,
            piggybank_accounts::TransactionType::Dummy
        );
        assert_eq!(entries.items[0].amount, eur(10_000));

        assert_eq!(
            *gateway.registered.lock().unwrap(),
            vec!["IBAN:DE1".to_string()]
        );
    }

    #[tokio::test]
    async fn gateway_outage_does_not_fail_account_creation() {
        let (twin, _) = twin_services(StubGateway::new(true));
        assert!(twin.create_account("IBAN", "DE1", eur(0)).await.is_ok());
    }

    #[tokio::test]
    async fn duplicate_account_creation_conflicts() {
        let (twin, _) = twin_services(StubGateway::new(false));
        twin.create_account("IBAN", "DE1", eur(0)).await.unwrap();

        let err = twin
            .create_account("IBAN", "DE1", eur(50))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn transaction_replay_publishes_no_second_update() {
        let (twin, _) = twin_services(StubGateway::new(false));
        let account = twin.create_account("IBAN", "DE1", eur(0)).await.unwrap();

        let consumer = twin.bus.subscribe();
        let request = TransactionRequest {
            id: None,
            transfer_id: TransferId::new(),
            account_id: account.id.clone(),
            amount: eur(1_000),
            valuation_timestamp: Utc::now(),
            purpose: "Rent".into(),
            kind: piggybank_accounts::TransactionType::Credit,
            source_account: None,
            destination_account: None,
        };

        let first = twin.process_transaction(request.clone()).unwrap();
        assert!(!first.replayed);
        let second = twin.process_transaction(request).unwrap();
        assert!(second.replayed);
        assert_eq!(second.transaction.id, first.transaction.id);
        assert_eq!(second.account.balance, eur(1_000));

        let mut updates = 0;
        while let Ok(envelope) = consumer.try_recv() {
            if envelope.routing_key() == "account.updated" {
                updates += 1;
            }
        }
        assert_eq!(updates, 1);
    }

    fn gateway_services(
        fail_on_kind: Option<piggybank_accounts::TransactionType>,
    ) -> (GatewayServices, Arc<InMemoryTwinStore>, SharedBus) {
        let registry = Arc::new(MonitoredAccounts::new());
        let twin_store = Arc::new(InMemoryTwinStore::new());
        let twin = Arc::new(StubTwin {
            store: twin_store.clone(),
            fail_on_kind,
        });
        let shared = bus();
        (
            GatewayServices::new(registry, shared.clone(), twin),
            twin_store,
            shared,
        )
    }

    fn transfer(source: &str, target: &str, cents: i64) -> Transfer {
        Transfer {
            id: TransferId::new(),
            source_account: AccountRef::new("IBAN", source).unwrap(),
            target_account: AccountRef::new("IBAN", target).unwrap(),
            amount: eur(cents),
            valuation_timestamp: Utc::now(),
            purpose: "Rent".into(),
        }
    }

    fn seed_twin_account(store: &Arc<InMemoryTwinStore>, identifier: &str) {
        let account = Account::create("IBAN", identifier, eur(100_000)).unwrap();
        store.insert_account(account).unwrap();
    }

    #[tokio::test]
    async fn unmonitored_transfer_is_a_successful_no_op() {
        let (gateway, _, shared) = gateway_services(None);
        let consumer = shared.subscribe();

        let outcome = gateway
            .process_transfer(transfer("DE1", "DE2", 1_000))
            .await
            .unwrap();

        assert_eq!(outcome, TransferOutcome::Unmonitored);
        assert!(consumer.try_recv().is_err(), "no transfer event expected");
    }

    #[tokio::test]
    async fn fully_monitored_transfer_forwards_both_legs() {
        let (gateway, twin_store, shared) = gateway_services(None);
        seed_twin_account(&twin_store, "DE1");
        seed_twin_account(&twin_store, "DE2");
        gateway.register(AccountRef::new("IBAN", "DE1").unwrap());
        gateway.register(AccountRef::new("IBAN", "DE2").unwrap());
        let consumer = shared.subscribe();

        let outcome = gateway
            .process_transfer(transfer("DE1", "DE2", 2_500))
            .await
            .unwrap();
        assert_eq!(outcome, TransferOutcome::Forwarded { legs: 2 });

        let source = twin_store
            .account(&AccountId::derive("IBAN", "DE1"))
            .unwrap()
            .unwrap();
        let target = twin_store
            .account(&AccountId::derive("IBAN", "DE2"))
            .unwrap()
            .unwrap();
        assert_eq!(source.balance, eur(97_500));
        assert_eq!(target.balance, eur(102_500));

        let envelope = consumer.try_recv().unwrap();
        assert_eq!(envelope.routing_key(), "transfer.event");
    }

    #[tokio::test]
    async fn partial_forwarding_failure_surfaces_but_keeps_the_delivered_leg() {
        let (gateway, twin_store, _) = gateway_services(Some(
            piggybank_accounts::TransactionType::Credit,
        ));
        seed_twin_account(&twin_store, "DE1");
        seed_twin_account(&twin_store, "DE2");
        gateway.register(AccountRef::new("IBAN", "DE1").unwrap());
        gateway.register(AccountRef::new("IBAN", "DE2").unwrap());

        let err = gateway
            .process_transfer(transfer("DE1", "DE2", 2_500))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Downstream(_)));

        // The debit leg went through before the credit leg failed; the gap is
        // accepted and observable, not rolled back.
        let source = twin_store
            .account(&AccountId::derive("IBAN", "DE1"))
            .unwrap()
            .unwrap();
        let target = twin_store
            .account(&AccountId::derive("IBAN", "DE2"))
            .unwrap()
            .unwrap();
        assert_eq!(source.balance, eur(97_500));
        assert_eq!(target.balance, eur(100_000));
    }

    fn notification_services() -> NotificationServices {
        NotificationServices::new(
            Arc::new(InMemoryNotificationStore::new()),
            Arc::new(InMemorySubscriptionStore::new()),
            bus(),
        )
    }

    fn updated_event(account_id: &AccountId) -> AccountEvent {
        AccountEvent::Updated {
            account_id: account_id.clone(),
            account_type: "IBAN".into(),
            account_identifier: "DE1".into(),
            balance: eur(11_000),
            transaction_id: TransactionId::new(),
            transaction_amount: eur(1_000),
            transaction_type: piggybank_accounts::TransactionType::Credit,
            transaction_purpose: "Rent".into(),
            source_account: Some("IBAN:DE2".into()),
            destination_account: Some("IBAN:DE1".into()),
        }
    }

    #[tokio::test]
    async fn events_without_subscriptions_create_no_notifications() {
        let services = notification_services();
        let account_id = AccountId::derive("IBAN", "DE1");

        let created = services
            .process_account_updated(updated_event(&account_id))
            .unwrap();
        assert!(created.is_none());
        assert_eq!(services.count_unread().unwrap(), 0);
    }

    #[tokio::test]
    async fn a_subscribed_account_gets_exactly_one_templated_notification() {
        let services = notification_services();
        let account_id = AccountId::derive("IBAN", "DE1");
        services
            .create_subscription(account_id.clone(), NotificationEventType::BalanceUpdate)
            .unwrap();

        let created = services
            .process_account_updated(updated_event(&account_id))
            .unwrap()
            .unwrap();
        assert_eq!(
            created.message,
            "You just received 10.00 EUR from IBAN:DE2 for: Rent"
        );
        assert!(!created.read);
        assert_eq!(services.count_unread().unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn consumer_drops_malformed_events_and_keeps_running() {
        let concrete = Arc::new(InMemoryEventBus::<Envelope>::new());
        let shared = SharedBus::new(concrete.clone());
        let services = Arc::new(NotificationServices::new(
            Arc::new(InMemoryNotificationStore::new()),
            Arc::new(InMemorySubscriptionStore::new()),
            shared,
        ));
        let account_id = AccountId::derive("IBAN", "DE1");
        services
            .create_subscription(account_id.clone(), NotificationEventType::BalanceUpdate)
            .unwrap();
        services.clone().spawn_consumer();

        // Required fields missing: decode fails closed, the message is dropped.
        let malformed = Envelope::new(
            uuid::Uuid::now_v7(),
            ACCOUNTS_TOPIC,
            "account.updated",
            serde_json::json!({
                "eventType": "ACCOUNT_UPDATED",
                "accountId": "IBAN:DE1",
            }),
        );
        piggybank_events::EventBus::publish(&concrete, malformed).unwrap();

        let valid = Envelope::from_event(&updated_event(&account_id)).unwrap();
        piggybank_events::EventBus::publish(&concrete, valid).unwrap();

        // Poll until the consumer has processed the valid event.
        for _ in 0..100 {
            if services.count_unread().unwrap() == 1 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        // Exactly one notification: the malformed event produced nothing.
        let page = services
            .notifications_page(NotificationFilter::default(), PageRequest::default())
            .unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn mark_read_republishes_and_is_idempotent() {
        let services = notification_services();
        let account_id = AccountId::derive("IBAN", "DE1");
        services
            .create_subscription(account_id.clone(), NotificationEventType::BalanceUpdate)
            .unwrap();
        let created = services
            .process_account_updated(updated_event(&account_id))
            .unwrap()
            .unwrap();

        let consumer = services.bus.subscribe();
        assert!(services.mark_read(&created.id).unwrap());
        assert!(services.mark_read(&created.id).unwrap());
        assert_eq!(services.count_unread().unwrap(), 0);

        let envelope = consumer.try_recv().unwrap();
        assert_eq!(envelope.routing_key(), "notification.created");
        assert_eq!(envelope.payload()["read"], true);

        assert!(!services.mark_read(&NotificationId::new()).unwrap());
    }
}
