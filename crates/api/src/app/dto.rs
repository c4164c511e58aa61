//! Request DTOs and JSON mapping helpers.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};

use piggybank_accounts::{Account, Transaction};
use piggybank_core::{Amount, DomainResult};
use piggybank_infra::stores::PageOf;
use piggybank_notifications::{Notification, NotificationEventType, NotificationSubscription};
use piggybank_transfers::AccountRef;

/// Body of `POST /api/accounts` on the twin service.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    #[serde(rename = "type")]
    pub account_type: String,
    pub identifier: String,
    pub initial_balance: Amount,
}

/// An account reference as the gateway receives it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRefDto {
    #[serde(rename = "type")]
    pub account_type: String,
    pub identifier: String,
    #[serde(default)]
    pub account_id: Option<String>,
}

impl AccountRefDto {
    /// Validated conversion; blank parts are a validation error.
    pub fn into_ref(self) -> DomainResult<AccountRef> {
        AccountRef::with_account_id(self.account_type, self.identifier, self.account_id)
    }
}

/// Body of the gateway's register/unregister endpoints.
#[derive(Debug, Deserialize)]
pub struct MonitoredAccountRequest {
    pub account: AccountRefDto,
}

/// Body of `POST /api/transfers`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub source_account: AccountRefDto,
    pub target_account: AccountRefDto,
    pub amount: Amount,
    pub valuation_timestamp: DateTime<Utc>,
    pub purpose: String,
}

/// Body of `POST /api/subscriptions`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionRequest {
    pub account_id: String,
    pub event_type: NotificationEventType,
}

/// `page`/`size` query parameters.
#[derive(Debug, Deserialize, Default)]
pub struct PageParams {
    pub page: Option<usize>,
    pub size: Option<usize>,
}

impl PageParams {
    pub fn to_request(&self) -> piggybank_infra::stores::PageRequest {
        piggybank_infra::stores::PageRequest::new(
            self.page.unwrap_or(0),
            self.size
                .unwrap_or(piggybank_infra::stores::PageRequest::DEFAULT_SIZE),
        )
    }
}

pub fn account_to_json(account: &Account) -> JsonValue {
    json!(account)
}

pub fn account_with_transactions_to_json(
    account: &Account,
    transactions: &[Transaction],
) -> JsonValue {
    let mut value = json!(account);
    value["transactions"] = json!(transactions);
    value
}

pub fn transaction_to_json(transaction: &Transaction) -> JsonValue {
    json!(transaction)
}

pub fn monitored_account_to_json(account: &AccountRef) -> JsonValue {
    json!(account)
}

pub fn notification_to_json(notification: &Notification) -> JsonValue {
    json!(notification)
}

pub fn subscription_to_json(subscription: &NotificationSubscription) -> JsonValue {
    json!(subscription)
}

pub fn page_to_json<T>(page: &PageOf<T>, item_to_json: impl Fn(&T) -> JsonValue) -> JsonValue {
    json!({
        "items": page.items.iter().map(item_to_json).collect::<Vec<_>>(),
        "page": page.page,
        "size": page.size,
        "total": page.total,
    })
}
