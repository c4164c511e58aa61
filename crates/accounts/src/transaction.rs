use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use piggybank_core::{AccountId, Amount, TransactionId, TransferId};

use crate::account::Account;

/// The direction of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Money coming in.
    Credit,
    /// Money going out.
    Debit,
    /// Synthetic opening-balance entry, created once per account and never
    /// applied or reversed.
    Dummy,
}

impl TransactionType {
    pub fn increases_balance(&self) -> bool {
        matches!(self, TransactionType::Credit)
    }

    pub fn decreases_balance(&self) -> bool {
        matches!(self, TransactionType::Debit)
    }
}

impl core::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            TransactionType::Credit => "CREDIT",
            TransactionType::Debit => "DEBIT",
            TransactionType::Dummy => "DUMMY",
        };
        f.write_str(s)
    }
}

/// One signed movement against a single account's balance.
///
/// `(transfer_id, account_id)` is the idempotency key: at most one entry may
/// exist for a given transfer leg, which is what makes replaying an intake
/// call safe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    pub transfer_id: TransferId,
    pub account_id: AccountId,
    pub amount: Amount,
    pub valuation_timestamp: DateTime<Utc>,
    pub purpose: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_account: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn is_credit(&self) -> bool {
        self.kind == TransactionType::Credit
    }

    pub fn is_debit(&self) -> bool {
        self.kind == TransactionType::Debit
    }

    /// The synthetic DUMMY entry recording an account's opening balance.
    pub fn initial_balance(account: &Account) -> Self {
        Self {
            id: TransactionId::new(),
            transfer_id: TransferId::new(),
            account_id: account.id.clone(),
            amount: account.balance.clone(),
            valuation_timestamp: Utc::now(),
            purpose: "Initial balance".to_string(),
            kind: TransactionType::Dummy,
            source_account: None,
            destination_account: None,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use piggybank_core::Currency;
    use rust_decimal::Decimal;

    #[test]
    fn only_credit_increases_and_only_debit_decreases() {
        assert!(TransactionType::Credit.increases_balance());
        assert!(!TransactionType::Credit.decreases_balance());
        assert!(TransactionType::Debit.decreases_balance());
        assert!(!TransactionType::Debit.increases_balance());
        assert!(!TransactionType::Dummy.increases_balance());
        assert!(!TransactionType::Dummy.decreases_balance());
    }

    #[test]
    fn initial_balance_entry_mirrors_the_account() {
        let account = Account::create(
            "BankAccount",
            "DE1234",
            Amount::new(Decimal::new(5000, 2), Currency::Eur),
        )
        .unwrap();

        let entry = Transaction::initial_balance(&account);
        assert_eq!(entry.account_id, account.id);
        assert_eq!(entry.amount, account.balance);
        assert_eq!(entry.kind, TransactionType::Dummy);
        assert_eq!(entry.purpose, "Initial balance");
    }

    #[test]
    fn wire_format_uses_camel_case_and_screaming_type() {
        let account = Account::create(
            "BankAccount",
            "DE1234",
            Amount::new(Decimal::ONE, Currency::Eur),
        )
        .unwrap();
        let entry = Transaction::initial_balance(&account);

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "DUMMY");
        assert_eq!(json["accountId"], "BankAccount:DE1234");
        assert!(json.get("sourceAccount").is_none());
        assert!(json["valuationTimestamp"].is_string());
    }
}
