use serde::{Deserialize, Serialize};

use piggybank_core::{AccountId, DomainError, DomainResult};

/// Lightweight pointer to an externally-held account.
///
/// Distinct from the twin's `Account` entity: it carries no balance, and
/// `account_id` (the twin-service id) is optional - an account can be
/// registered for monitoring before its twin exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRef {
    #[serde(rename = "type")]
    pub account_type: String,
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
}

impl AccountRef {
    pub fn new(
        account_type: impl Into<String>,
        identifier: impl Into<String>,
    ) -> DomainResult<Self> {
        Self::with_account_id(account_type, identifier, None)
    }

    pub fn with_account_id(
        account_type: impl Into<String>,
        identifier: impl Into<String>,
        account_id: Option<String>,
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
            account_type,
            identifier,
            account_id,
        })
    }

    /// Monitoring identity of this ref.
    pub fn key(&self) -> AccountKey {
        AccountKey {
            account_type: self.account_type.clone(),
            identifier: self.identifier.clone(),
        }
    }

    /// The twin-service id this ref maps to (`"type:identifier"`).
    pub fn twin_account_id(&self) -> AccountId {
        AccountId::derive(&self.account_type, &self.identifier)
    }
}

impl core::fmt::Display for AccountRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}", self.account_type, self.identifier)
    }
}

/// Identity of a monitored account: `(type, identifier)` only.
///
/// `account_id` is deliberately not part of this key, so a ref registered
/// before its twin-service id was known still matches later lookups that do
/// carry one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountKey {
    pub account_type: String,
    pub identifier: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_ignores_the_twin_account_id() {
        let bare = AccountRef::new("IBAN", "DE1").unwrap();
        let with_id =
            AccountRef::with_account_id("IBAN", "DE1", Some("IBAN:DE1".to_string())).unwrap();

        assert_eq!(bare.key(), with_id.key());
        assert_ne!(bare, with_id);
    }

    #[test]
    fn blank_parts_are_rejected() {
        assert!(AccountRef::new(" ", "DE1").is_err());
        assert!(AccountRef::new("IBAN", "").is_err());
    }

    #[test]
    fn wire_format_matches_the_gateway_contract() {
        let r = AccountRef::with_account_id("IBAN", "DE1", Some("IBAN:DE1".into())).unwrap();
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["type"], "IBAN");
        assert_eq!(json["identifier"], "DE1");
        assert_eq!(json["accountId"], "IBAN:DE1");

        let bare = AccountRef::new("IBAN", "DE1").unwrap();
        let json = serde_json::to_value(&bare).unwrap();
        assert!(json.get("accountId").is_none());
    }
}
