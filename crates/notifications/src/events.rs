//! Integration event published when a notification is created or updated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use piggybank_core::{AccountId, NotificationId};
use piggybank_events::IntegrationEvent;

use crate::notification::{Notification, NotificationEventType};

/// Topic (exchange) carrying notification events.
pub const NOTIFICATIONS_TOPIC: &str = "piggybank.notifications";

/// Snapshot of a notification as published to live listeners.
///
/// The same routing key is reused when a notification is marked read (with
/// `read: true`), so feeds can reflect the change without a second event
/// kind. The `eventType` field here is the *notification's* event type
/// (e.g. `BALANCE_UPDATE`), matching the stored record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    pub id: NotificationId,
    pub account_id: AccountId,
    pub event_type: NotificationEventType,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Notification> for NotificationEvent {
    fn from(n: &Notification) -> Self {
        Self {
            id: n.id,
            account_id: n.account_id.clone(),
            event_type: n.event_type,
            message: n.message.clone(),
            read: n.read,
            created_at: n.created_at,
        }
    }
}

impl IntegrationEvent for NotificationEvent {
    fn topic(&self) -> &'static str {
        NOTIFICATIONS_TOPIC
    }

    fn routing_key(&self) -> &'static str {
        "notification.created"
    }

    fn event_type(&self) -> &'static str {
        "NOTIFICATION_CREATED"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use piggybank_events::Envelope;

    #[test]
    fn notification_event_mirrors_the_stored_record() {
        let n = Notification::create(
            AccountId::derive("IBAN", "DE1"),
            NotificationEventType::BalanceUpdate,
            "You just received 10 EUR",
        );

        let envelope = Envelope::from_event(&NotificationEvent::from(&n)).unwrap();
        assert_eq!(envelope.topic(), "piggybank.notifications");
        assert_eq!(envelope.routing_key(), "notification.created");
        assert_eq!(envelope.payload()["eventType"], "BALANCE_UPDATE");
        assert_eq!(envelope.payload()["read"], false);

        let decoded: NotificationEvent = envelope.decode().unwrap();
        assert_eq!(decoded.message, n.message);
    }
}
