use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use piggybank_core::{AccountId, SubscriptionId};

use crate::notification::NotificationEventType;

/// A per-account subscription to one notification event kind.
///
/// Deactivation is a soft delete: the row stays around so history is kept and
/// re-activation remains possible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSubscription {
    pub id: SubscriptionId,
    pub account_id: AccountId,
    pub event_type: NotificationEventType,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl NotificationSubscription {
    /// Create a new active subscription.
    pub fn create(account_id: AccountId, event_type: NotificationEventType) -> Self {
        Self {
            id: SubscriptionId::new(),
            account_id,
            event_type,
            active: true,
            created_at: Utc::now(),
        }
    }

    pub fn deactivate(&self) -> Self {
        Self {
            active: false,
            ..self.clone()
        }
    }

    pub fn activate(&self) -> Self {
        Self {
            active: true,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_flips_only_the_active_flag() {
        let sub = NotificationSubscription::create(
            AccountId::derive("IBAN", "DE1"),
            NotificationEventType::BalanceUpdate,
        );
        assert!(sub.active);

        let off = sub.deactivate();
        assert!(!off.active);
        assert_eq!(off.id, sub.id);

        let on = off.activate();
        assert!(on.active);
        assert_eq!(on.created_at, sub.created_at);
    }
}
