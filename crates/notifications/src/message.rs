//! Human-readable message templates for balance updates.

use piggybank_accounts::TransactionType;
use piggybank_core::Amount;

/// Render the notification text for one balance update.
///
/// The counter-account and purpose clauses are appended only when the field
/// is present and non-blank. The same wording is reused for every subscriber
/// matched by the event.
pub fn balance_update_message(
    kind: TransactionType,
    amount: &Amount,
    source_account: Option<&str>,
    destination_account: Option<&str>,
    purpose: &str,
) -> String {
    match kind {
        TransactionType::Credit => {
            let mut message = format!("You just received {} {}", amount.value, amount.currency);
            if let Some(source) = non_blank(source_account) {
                message.push_str(&format!(" from {source}"));
            }
            if let Some(purpose) = non_blank(Some(purpose)) {
                message.push_str(&format!(" for: {purpose}"));
            }
            message
        }
        TransactionType::Debit => {
            let mut message = format!("You just sent {} {}", amount.value, amount.currency);
            if let Some(destination) = non_blank(destination_account) {
                message.push_str(&format!(" to {destination}"));
            }
            if let Some(purpose) = non_blank(Some(purpose)) {
                message.push_str(&format!(" for: {purpose}"));
            }
            message
        }
        TransactionType::Dummy => format!(
            "Your account balance has been updated by {} {}",
            amount.value, amount.currency
        ),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use piggybank_core::Currency;
    use rust_decimal::Decimal;

    fn eur(s: &str) -> Amount {
        Amount::new(s.parse::<Decimal>().unwrap(), Currency::Eur)
    }

    #[test]
    fn credit_message_with_all_clauses() {
        let message = balance_update_message(
            TransactionType::Credit,
            &eur("10.00"),
            Some("IBAN:DE1"),
            Some("IBAN:DE2"),
            "Rent",
        );
        assert_eq!(message, "You just received 10.00 EUR from IBAN:DE1 for: Rent");
    }

    #[test]
    fn debit_message_uses_the_destination_side() {
        let message = balance_update_message(
            TransactionType::Debit,
            &eur("3.50"),
            Some("IBAN:DE1"),
            Some("PayPal:bob@example.com"),
            "",
        );
        assert_eq!(message, "You just sent 3.50 EUR to PayPal:bob@example.com");
    }

    #[test]
    fn blank_clauses_are_dropped() {
        let message = balance_update_message(
            TransactionType::Credit,
            &eur("1"),
            None,
            None,
            "   ",
        );
        assert_eq!(message, "You just received 1 EUR");
    }

    #[test]
    fn other_transaction_types_fall_back_to_the_generic_wording() {
        let message =
            balance_update_message(TransactionType::Dummy, &eur("7"), None, None, "ignored");
        assert_eq!(message, "Your account balance has been updated by 7 EUR");
    }
}
