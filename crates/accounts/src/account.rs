use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use piggybank_core::{AccountId, Amount, DomainError, DomainResult, Entity};

use crate::transaction::TransactionType;

/// Shadow copy of an externally-held account.
///
/// The id is derived from the natural key (`"<type>:<identifier>"`). Balance
/// updates never mutate an `Account` in place: [`Account::apply`] returns the
/// next state, and the store swaps the persisted value as a whole. That keeps
/// concurrent transaction application a pure replace-under-lock problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    #[serde(rename = "type")]
    pub account_type: String,
    pub identifier: String,
    pub balance: Amount,
    pub created_at: DateTime<Utc>,
}

impl Entity for Account {
    type Id = AccountId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Account {
    /// Create a new account with the given opening balance.
    pub fn create(
        account_type: impl Into<String>,
        identifier: impl Into<String>,
        initial_balance: Amount,
    ) -> DomainResult<Self> {
        let account_type = account_type.into();
        let identifier = identifier.into();

        if account_type.trim().is_empty() {
            return Err(DomainError::validation("account type cannot be blank"));
        }
        if identifier.trim().is_empty() {
            return Err(DomainError::validation("account identifier cannot be blank"));
        }

        Ok(Self {
            id: AccountId::derive(&account_type, &identifier),
            account_type,
            identifier,
            balance: initial_balance,
            created_at: Utc::now(),
        })
    }

    /// Next account state after applying one ledger entry.
    ///
    /// CREDIT adds the amount, DEBIT adds its negation. DUMMY records an
    /// opening balance and is never applied.
    pub fn apply(&self, kind: TransactionType, amount: &Amount) -> DomainResult<Account> {
        let new_balance = match kind {
            TransactionType::Credit => self.balance.add(amount)?,
            TransactionType::Debit => self.balance.add(&amount.negate())?,
            TransactionType::Dummy => {
                return Err(DomainError::invariant(
                    "dummy transactions cannot be applied to a balance",
                ));
            }
        };

        Ok(Self {
            balance: new_balance,
            ..self.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use piggybank_core::Currency;
    use rust_decimal::Decimal;

    fn eur(cents: i64) -> Amount {
        Amount::new(Decimal::new(cents, 2), Currency::Eur)
    }

    fn account() -> Account {
        Account::create("BankAccount", "DE1234", eur(10_000)).unwrap()
    }

    #[test]
    fn create_rejects_blank_natural_key_parts() {
        assert!(Account::create("", "DE1234", eur(0)).is_err());
        assert!(Account::create("BankAccount", "  ", eur(0)).is_err());
    }

    #[test]
    fn credit_increases_and_debit_decreases_the_balance() {
        let account = account();

        let credited = account.apply(TransactionType::Credit, &eur(2_500)).unwrap();
        assert_eq!(credited.balance, eur(12_500));

        let debited = account.apply(TransactionType::Debit, &eur(2_500)).unwrap();
        assert_eq!(debited.balance, eur(7_500));

        // The original account state is untouched.
        assert_eq!(account.balance, eur(10_000));
    }

    #[test]
    fn apply_preserves_identity_fields() {
        let account = account();
        let next = account.apply(TransactionType::Credit, &eur(1)).unwrap();
        assert_eq!(next.id, account.id);
        assert_eq!(next.account_type, account.account_type);
        assert_eq!(next.identifier, account.identifier);
        assert_eq!(next.created_at, account.created_at);
    }

    #[test]
    fn cross_currency_application_fails_without_partial_state() {
        let account = account();
        let err = account
            .apply(
                TransactionType::Credit,
                &Amount::new(Decimal::ONE, Currency::Usd),
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(account.balance, eur(10_000));
    }

    #[test]
    fn dummy_entries_are_never_applied() {
        let err = account()
            .apply(TransactionType::Dummy, &eur(1))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }
}
