//! The wire-level projection of a newly created transaction.

use serde::{Deserialize, Serialize};

use crate::{
    Error,
    transaction::{AccountType, Transaction, TransactionId, core::format_date_time},
};

/// The payload broadcast to subscribers when a transaction is created.
///
/// This is an ephemeral projection: built once after a successful write,
/// published once, and never persisted. `amount` and `created_at` are
/// pre-formatted strings, treated as immutable display data by clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionNotification {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The display name of the user who created the transaction.
    pub user: String,
    /// The amount, formatted to two decimal places with thousands grouping,
    /// e.g. "1,234.50".
    pub amount: String,
    /// A text description of what the transaction was for.
    pub description: String,
    /// The account the transaction was recorded against.
    #[serde(rename = "accountType")]
    pub account_type: AccountType,
    /// The creation timestamp, formatted as "YYYY-MM-DD hh:mm:ss".
    pub created_at: String,
}

impl TransactionNotification {
    /// Build the notification for `transaction`, owned by the user whose
    /// display name is `user_name`.
    ///
    /// # Errors
    /// Returns an [Error::InvalidDateFormat] if the creation timestamp
    /// cannot be formatted.
    pub fn from_transaction(transaction: &Transaction, user_name: &str) -> Result<Self, Error> {
        Ok(Self {
            id: transaction.id,
            user: user_name.to_owned(),
            amount: format_amount(transaction.amount),
            description: transaction.description.clone(),
            account_type: transaction.account_type,
            created_at: format_date_time(transaction.created_at)?,
        })
    }
}

/// Format an amount to two decimal places with thousands grouping.
pub(crate) fn format_amount(amount: f64) -> String {
    let unsigned = format!("{:.2}", amount.abs());
    // A non-finite amount formats without a decimal point; amounts are
    // validated finite at the API boundary, so pass those through as-is.
    let Some((integer_part, fraction_part)) = unsigned.split_once('.') else {
        return unsigned;
    };

    let mut grouped = String::with_capacity(unsigned.len() + integer_part.len() / 3);
    for (i, digit) in integer_part.chars().enumerate() {
        if i > 0 && (integer_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    // A negative amount that rounds to zero displays without a sign.
    let sign = if amount < 0.0 && unsigned != "0.00" {
        "-"
    } else {
        ""
    };

    format!("{sign}{grouped}.{fraction_part}")
}

#[cfg(test)]
mod notification_tests {
    use time::macros::datetime;

    use crate::{
        broadcast::notification::{TransactionNotification, format_amount},
        transaction::{AccountType, Transaction},
        user::UserID,
    };

    #[test]
    fn formats_amounts_to_two_decimals_with_grouping() {
        assert_eq!(format_amount(100.5), "100.50");
        assert_eq!(format_amount(0.0), "0.00");
        assert_eq!(format_amount(7.0), "7.00");
        assert_eq!(format_amount(1234.5), "1,234.50");
        assert_eq!(format_amount(1234567.891), "1,234,567.89");
        assert_eq!(format_amount(-1234.5), "-1,234.50");
        assert_eq!(format_amount(-0.001), "0.00");
    }

    #[test]
    fn wire_format_has_exactly_the_expected_keys() {
        let transaction = Transaction {
            id: 42,
            user_id: UserID::new(1),
            amount: 100.5,
            description: "Grocery shopping".to_owned(),
            account_type: AccountType::Checking,
            created_at: datetime!(2026-08-30 17:45:03 UTC),
        };

        let notification =
            TransactionNotification::from_transaction(&transaction, "Alice").unwrap();
        let json = serde_json::to_string(&notification).unwrap();

        assert_eq!(
            json,
            r#"{"id":42,"user":"Alice","amount":"100.50","description":"Grocery shopping","accountType":"checking","created_at":"2026-08-30 17:45:03"}"#
        );
    }

    #[test]
    fn notification_round_trips_through_json() {
        let transaction = Transaction {
            id: 7,
            user_id: UserID::new(2),
            amount: -12.345,
            description: "Refund".to_owned(),
            account_type: AccountType::Credit,
            created_at: datetime!(2026-01-02 03:04:05 UTC),
        };
        let notification = TransactionNotification::from_transaction(&transaction, "Bob").unwrap();

        let json = serde_json::to_string(&notification).unwrap();
        let parsed: TransactionNotification = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, notification);
        assert_eq!(parsed.amount, "-12.35");
    }
}
