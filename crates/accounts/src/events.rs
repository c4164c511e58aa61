//! Integration events published by the account twin.

use serde::{Deserialize, Serialize};

use piggybank_core::{AccountId, Amount, TransactionId};
use piggybank_events::IntegrationEvent;

use crate::account::Account;
use crate::transaction::{Transaction, TransactionType};

/// Topic (exchange) carrying account lifecycle events.
pub const ACCOUNTS_TOPIC: &str = "piggybank.accounts";

/// Account lifecycle events, tagged by `eventType` on the wire.
///
/// Decoding is strict: a payload missing a required field is rejected by the
/// consumer instead of being patched with defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "eventType")]
pub enum AccountEvent {
    #[serde(rename = "ACCOUNT_CREATED", rename_all = "camelCase")]
    Created {
        account_id: AccountId,
        account_type: String,
        account_identifier: String,
        balance: Amount,
    },

    #[serde(rename = "ACCOUNT_UPDATED", rename_all = "camelCase")]
    Updated {
        account_id: AccountId,
        account_type: String,
        account_identifier: String,
        balance: Amount,
        transaction_id: TransactionId,
        transaction_amount: Amount,
        transaction_type: TransactionType,
        transaction_purpose: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source_account: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        destination_account: Option<String>,
    },

    #[serde(rename = "ACCOUNT_DELETED", rename_all = "camelCase")]
    Deleted {
        account_id: AccountId,
        account_type: String,
        account_identifier: String,
    },
}

impl AccountEvent {
    pub fn created(account: &Account) -> Self {
        AccountEvent::Created {
            account_id: account.id.clone(),
            account_type: account.account_type.clone(),
            account_identifier: account.identifier.clone(),
            balance: account.balance.clone(),
        }
    }

    /// Update event carrying both the new balance and the triggering entry.
    pub fn updated(account: &Account, transaction: &Transaction) -> Self {
        AccountEvent::Updated {
            account_id: account.id.clone(),
            account_type: account.account_type.clone(),
            account_identifier: account.identifier.clone(),
            balance: account.balance.clone(),
            transaction_id: transaction.id,
            transaction_amount: transaction.amount.clone(),
            transaction_type: transaction.kind,
            transaction_purpose: transaction.purpose.clone(),
            source_account: transaction.source_account.clone(),
            destination_account: transaction.destination_account.clone(),
        }
    }

    pub fn deleted(account: &Account) -> Self {
        AccountEvent::Deleted {
            account_id: account.id.clone(),
            account_type: account.account_type.clone(),
            account_identifier: account.identifier.clone(),
        }
    }
}

impl IntegrationEvent for AccountEvent {
    fn topic(&self) -> &'static str {
        ACCOUNTS_TOPIC
    }

    fn routing_key(&self) -> &'static str {
        match self {
            AccountEvent::Created { .. } => "account.created",
            AccountEvent::Updated { .. } => "account.updated",
            AccountEvent::Deleted { .. } => "account.deleted",
        }
    }

    fn event_type(&self) -> &'static str {
        match self {
            AccountEvent::Created { .. } => "ACCOUNT_CREATED",
            AccountEvent::Updated { .. } => "ACCOUNT_UPDATED",
            AccountEvent::Deleted { .. } => "ACCOUNT_DELETED",
        }
    }
}
