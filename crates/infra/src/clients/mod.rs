//! HTTP clients for the synchronous hops between services.
//!
//! Both hops sit behind a trait so the orchestration layer (and its tests)
//! never touch `reqwest` directly:
//! - gateway -> twin: forwarding synthesized ledger entries
//!   ([`twin::TransactionIntake`]),
//! - twin -> gateway: best-effort monitored-account registration
//!   ([`gateway::MonitorRegistration`]).

pub mod gateway;
pub mod twin;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use piggybank_accounts::{Transaction, TransactionType};
use piggybank_core::{AccountId, Amount, TransactionId, TransferId};

pub use gateway::{HttpGatewayClient, MonitorRegistration};
pub use twin::{HttpTwinClient, IntakeStatus, TransactionIntake};

/// Client-side failure of a service-to-service call.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced a usable response (connect, timeout, ...).
    #[error("request failed: {0}")]
    Transport(String),

    /// The downstream answered with an unexpected status.
    #[error("unexpected status {status}: {message}")]
    Status { status: u16, message: String },
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Transport(e.to_string())
    }
}

/// Wire DTO of the twin's transaction intake.
///
/// The gateway serializes this exact type when forwarding a leg, and the twin
/// deserializes it - one schema, two sides. The timestamp fields are strict
/// RFC 3339: a value without seconds or offset fails deserialization instead
/// of being defaulted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    /// Client-supplied id; minted server-side when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TransactionId>,
    pub transfer_id: TransferId,
    pub account_id: AccountId,
    pub amount: Amount,
    pub valuation_timestamp: DateTime<Utc>,
    pub purpose: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_account: Option<String>,
}

impl TransactionRequest {
    pub fn from_transaction(t: &Transaction) -> Self {
        Self {
            id: Some(t.id),
            transfer_id: t.transfer_id,
            account_id: t.account_id.clone(),
            amount: t.amount.clone(),
            valuation_timestamp: t.valuation_timestamp,
            purpose: t.purpose.clone(),
            kind: t.kind,
            source_account: t.source_account.clone(),
            destination_account: t.destination_account.clone(),
        }
    }

    /// Materialize the ledger entry this request describes.
    pub fn into_transaction(self) -> Transaction {
        Transaction {
            id: self.id.unwrap_or_default(),
            transfer_id: self.transfer_id,
            account_id: self.account_id,
            amount: self.amount,
            valuation_timestamp: self.valuation_timestamp,
            purpose: self.purpose,
            kind: self.kind,
            source_account: self.source_account,
            destination_account: self.destination_account,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_without_offset_or_seconds_are_rejected() {
        let body = |ts: &str| {
            format!(
                r#"{{
                    "transferId": "018f00aa-0000-7000-8000-000000000000",
                    "accountId": "IBAN:DE1",
                    "amount": {{"value": "10.00", "currencyCode": "EUR"}},
                    "valuationTimestamp": "{ts}",
                    "purpose": "Rent",
                    "type": "CREDIT"
                }}"#
            )
        };

        assert!(serde_json::from_str::<TransactionRequest>(&body("2025-06-01T10:00:00Z")).is_ok());
        assert!(
            serde_json::from_str::<TransactionRequest>(&body("2025-06-01T10:00:00+02:00")).is_ok()
        );
        // No offset marker.
        assert!(serde_json::from_str::<TransactionRequest>(&body("2025-06-01T10:00:00")).is_err());
        // No seconds.
        assert!(serde_json::from_str::<TransactionRequest>(&body("2025-06-01T10:00Z")).is_err());
    }

    #[test]
    fn round_trips_a_transaction() {
        let account = piggybank_accounts::Account::create(
            "IBAN",
            "DE1",
            "100 EUR".parse().unwrap(),
        )
        .unwrap();
        let t = Transaction::initial_balance(&account);

        let request = TransactionRequest::from_transaction(&t);
        let back = request.into_transaction();
        assert_eq!(back.id, t.id);
        assert_eq!(back.transfer_id, t.transfer_id);
        assert_eq!(back.amount, t.amount);
        assert_eq!(back.kind, t.kind);
    }
}
