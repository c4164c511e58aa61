use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use piggybank_accounts::{Transaction, TransactionType};
use piggybank_core::{Amount, TransactionId, TransferId};

use crate::account_ref::AccountRef;

/// A two-sided movement of funds between external account references.
///
/// Transfers are transient: the gateway never persists them. Their only
/// lasting trace is the pair of ledger entries they fan out into, both tagged
/// with the transfer id so the twin can deduplicate replays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    pub id: TransferId,
    pub source_account: AccountRef,
    pub target_account: AccountRef,
    pub amount: Amount,
    pub valuation_timestamp: DateTime<Utc>,
    pub purpose: String,
}

impl Transfer {
    /// Whether the given ref is the source or target of this transfer.
    pub fn involves(&self, account: &AccountRef) -> bool {
        self.source_account.key() == account.key() || self.target_account.key() == account.key()
    }

    /// The DEBIT leg against the source account.
    pub fn debit_leg(&self) -> Transaction {
        self.leg(self.source_account.twin_account_id(), TransactionType::Debit)
    }

    /// The CREDIT leg against the target account.
    pub fn credit_leg(&self) -> Transaction {
        self.leg(self.target_account.twin_account_id(), TransactionType::Credit)
    }

    fn leg(&self, account_id: piggybank_core::AccountId, kind: TransactionType) -> Transaction {
        Transaction {
            id: TransactionId::new(),
            transfer_id: self.id,
            account_id,
            amount: self.amount.clone(),
            valuation_timestamp: self.valuation_timestamp,
            purpose: self.purpose.clone(),
            kind,
            source_account: Some(self.source_account.to_string()),
            destination_account: Some(self.target_account.to_string()),
            created_at: Utc::now(),
        }
    }

    /// Synthesize the ledger entries for the monitored sides of this transfer.
    ///
    /// A transfer touching no monitored account produces nothing - that is a
    /// successful no-op, not an error.
    pub fn fan_out(&self, source_monitored: bool, target_monitored: bool) -> Vec<Transaction> {
        let mut legs = Vec::with_capacity(2);
        if source_monitored {
            legs.push(self.debit_leg());
        }
        if target_monitored {
            legs.push(self.credit_leg());
        }
        legs
    }
}
