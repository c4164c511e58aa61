use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use piggybank_core::{AccountId, NotificationId};

/// Event kinds a user can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationEventType {
    /// Money received or sent.
    BalanceUpdate,
    AccountCreated,
    AccountDeleted,
}

impl core::fmt::Display for NotificationEventType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            NotificationEventType::BalanceUpdate => "BALANCE_UPDATE",
            NotificationEventType::AccountCreated => "ACCOUNT_CREATED",
            NotificationEventType::AccountDeleted => "ACCOUNT_DELETED",
        };
        f.write_str(s)
    }
}

/// A stored, human-readable notification for one account.
///
/// Created unread; the only state transition is the one-way read flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    pub account_id: AccountId,
    pub event_type: NotificationEventType,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn create(
        account_id: AccountId,
        event_type: NotificationEventType,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            account_id,
            event_type,
            message: message.into(),
            read: false,
            created_at: Utc::now(),
        }
    }

    /// A copy with the read flag set. Marking twice is a no-op.
    pub fn mark_read(&self) -> Self {
        Self {
            read: true,
            ..self.clone()
        }
    }
}
