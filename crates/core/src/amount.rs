//! Monetary amounts.
//!
//! `Amount` is the arithmetic primitive of the whole system: an immutable
//! decimal value paired with a validated ISO-4217 currency. All operations
//! produce a new `Amount`; nothing here mutates in place.

use core::str::FromStr;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// ISO-4217 currency, validated at construction.
///
/// Only the alphabetic code is carried; an unrecognized code is a validation
/// error, never a silently accepted string.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Currency {
    Aud,
    Brl,
    Cad,
    Chf,
    Cny,
    Czk,
    Dkk,
    Eur,
    Gbp,
    Hkd,
    Huf,
    Idr,
    Ils,
    Inr,
    Jpy,
    Krw,
    Mxn,
    Nok,
    Nzd,
    Pln,
    Ron,
    Sek,
    Sgd,
    Thb,
    Try,
    Usd,
    Zar,
}

impl Currency {
    /// The ISO-4217 alphabetic code.
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Aud => "AUD",
            Currency::Brl => "BRL",
            Currency::Cad => "CAD",
            Currency::Chf => "CHF",
            Currency::Cny => "CNY",
            Currency::Czk => "CZK",
            Currency::Dkk => "DKK",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Hkd => "HKD",
            Currency::Huf => "HUF",
            Currency::Idr => "IDR",
            Currency::Ils => "ILS",
            Currency::Inr => "INR",
            Currency::Jpy => "JPY",
            Currency::Krw => "KRW",
            Currency::Mxn => "MXN",
            Currency::Nok => "NOK",
            Currency::Nzd => "NZD",
            Currency::Pln => "PLN",
            Currency::Ron => "RON",
            Currency::Sek => "SEK",
            Currency::Sgd => "SGD",
            Currency::Thb => "THB",
            Currency::Try => "TRY",
            Currency::Usd => "USD",
            Currency::Zar => "ZAR",
        }
    }
}

impl TryFrom<&str> for Currency {
    type Error = DomainError;

    fn try_from(code: &str) -> Result<Self, Self::Error> {
        let c = match code {
            "AUD" => Currency::Aud,
            "BRL" => Currency::Brl,
            "CAD" => Currency::Cad,
            "CHF" => Currency::Chf,
            "CNY" => Currency::Cny,
            "CZK" => Currency::Czk,
            "DKK" => Currency::Dkk,
            "EUR" => Currency::Eur,
            "GBP" => Currency::Gbp,
            "HKD" => Currency::Hkd,
            "HUF" => Currency::Huf,
            "IDR" => Currency::Idr,
            "ILS" => Currency::Ils,
            "INR" => Currency::Inr,
            "JPY" => Currency::Jpy,
            "KRW" => Currency::Krw,
            "MXN" => Currency::Mxn,
            "NOK" => Currency::Nok,
            "NZD" => Currency::Nzd,
            "PLN" => Currency::Pln,
            "RON" => Currency::Ron,
            "SEK" => Currency::Sek,
            "SGD" => Currency::Sgd,
            "THB" => Currency::Thb,
            "TRY" => Currency::Try,
            "USD" => Currency::Usd,
            "ZAR" => Currency::Zar,
            other => {
                return Err(DomainError::validation(format!(
                    "unknown currency code: {other}"
                )));
            }
        };
        Ok(c)
    }
}

impl TryFrom<String> for Currency {
    type Error = DomainError;

    fn try_from(code: String) -> Result<Self, Self::Error> {
        Currency::try_from(code.as_str())
    }
}

impl From<Currency> for String {
    fn from(value: Currency) -> Self {
        value.code().to_string()
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

/// Immutable monetary amount: decimal value + currency.
///
/// Arithmetic requires both sides to share the currency; mixing currencies
/// is a validation error and produces no partial result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Amount {
    pub value: Decimal,
    #[serde(rename = "currencyCode")]
    pub currency: Currency,
}

impl ValueObject for Amount {}

impl Amount {
    pub fn new(value: Decimal, currency: Currency) -> Self {
        Self { value, currency }
    }

    /// The zero amount in the given currency.
    pub fn zero(currency: Currency) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    /// A new amount with the value negated.
    pub fn negate(&self) -> Self {
        Self::new(-self.value, self.currency)
    }

    /// Sum of two amounts of the same currency.
    pub fn add(&self, other: &Amount) -> DomainResult<Amount> {
        if self.currency != other.currency {
            return Err(DomainError::validation(format!(
                "cannot add amounts with different currencies: {} vs {}",
                self.currency, other.currency
            )));
        }
        Ok(Self::new(self.value + other.value, self.currency))
    }

    pub fn is_positive(&self) -> bool {
        self.value > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.value < Decimal::ZERO
    }
}

impl core::fmt::Display for Amount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} {}", self.value, self.currency)
    }
}

impl FromStr for Amount {
    type Err = DomainError;

    /// Parse from the `"value currencyCode"` form, e.g. `"12.34 EUR"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split_whitespace();
        let (value, code) = match (parts.next(), parts.next(), parts.next()) {
            (Some(value), Some(code), None) => (value, code),
            _ => {
                return Err(DomainError::validation(format!(
                    "invalid amount string: {s} (expected: value currencyCode)"
                )));
            }
        };
        let value = Decimal::from_str(value)
            .map_err(|e| DomainError::validation(format!("invalid amount value {value}: {e}")))?;
        let currency = Currency::try_from(code)?;
        Ok(Self::new(value, currency))
    }
}
