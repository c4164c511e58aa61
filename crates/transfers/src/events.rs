//! Integration event published by the gateway for audit/observability.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use piggybank_core::{Amount, TransferId};
use piggybank_events::IntegrationEvent;

use crate::account_ref::AccountRef;
use crate::transfer::Transfer;

/// Topic (exchange) carrying transfer events.
pub const TRANSFERS_TOPIC: &str = "piggybank.transfers";

/// Published once per transfer that touches at least one monitored account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "eventType")]
pub enum TransferEvent {
    #[serde(rename = "TRANSFER_EVENT", rename_all = "camelCase")]
    Submitted {
        transfer_id: TransferId,
        source_account: AccountRef,
        target_account: AccountRef,
        amount: Amount,
        valuation_timestamp: DateTime<Utc>,
        purpose: String,
    },
}

impl TransferEvent {
    pub fn submitted(transfer: &Transfer) -> Self {
        TransferEvent::Submitted {
            transfer_id: transfer.id,
            source_account: transfer.source_account.clone(),
            target_account: transfer.target_account.clone(),
            amount: transfer.amount.clone(),
            valuation_timestamp: transfer.valuation_timestamp,
            purpose: transfer.purpose.clone(),
        }
    }
}

impl IntegrationEvent for TransferEvent {
    fn topic(&self) -> &'static str {
        TRANSFERS_TOPIC
    }

    fn routing_key(&self) -> &'static str {
        "transfer.event"
    }

    fn event_type(&self) -> &'static str {
        "TRANSFER_EVENT"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use piggybank_core::Currency;
    use piggybank_events::Envelope;
    use rust_decimal::Decimal;

    #[test]
    fn transfer_event_carries_the_full_transfer() {
        let transfer = Transfer {
            id: TransferId::new(),
            source_account: AccountRef::new("IBAN", "DE1").unwrap(),
            target_account: AccountRef::new("IBAN", "DE2").unwrap(),
            amount: Amount::new(Decimal::new(500, 2), Currency::Eur),
            valuation_timestamp: Utc::now(),
            purpose: "Lunch".to_string(),
        };

        let envelope = Envelope::from_event(&TransferEvent::submitted(&transfer)).unwrap();
        assert_eq!(envelope.topic(), "piggybank.transfers");
        assert_eq!(envelope.routing_key(), "transfer.event");
        assert_eq!(envelope.payload()["eventType"], "TRANSFER_EVENT");
        assert_eq!(envelope.payload()["sourceAccount"]["type"], "IBAN");

        let decoded: TransferEvent = envelope.decode().unwrap();
        assert_eq!(decoded, TransferEvent::submitted(&transfer));
    }
}
