//! Field-level validation for the create-transaction request.
//!
//! The request body is deserialized loosely so that a wrong type in one
//! field, e.g. a non-numeric amount, is reported as a validation error for
//! that field instead of a blanket deserialization failure.

use serde::Deserialize;
use serde_json::Value;

use crate::{
    Error, FieldError,
    transaction::{AccountType, NewTransaction},
    user::UserID,
};

/// The longest allowed transaction description, in characters.
const DESCRIPTION_MAX_CHARS: usize = 255;

/// The raw body of a `POST /api/transactions` request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateTransactionRequest {
    /// The transaction amount: a JSON number, or a numeric string.
    #[serde(default)]
    pub amount: Option<Value>,
    /// Text detailing the transaction.
    #[serde(default)]
    pub description: Option<String>,
    /// One of "checking", "savings" or "credit".
    #[serde(default)]
    pub account_type: Option<String>,
}

impl CreateTransactionRequest {
    /// Validate the request into a [NewTransaction] owned by `user_id`.
    ///
    /// # Errors
    /// Returns an [Error::Validation] naming every offending field. Nothing
    /// is persisted on failure.
    pub(crate) fn validate(self, user_id: UserID) -> Result<NewTransaction, Error> {
        let mut field_errors = Vec::new();

        let amount = match self.amount.as_ref().and_then(parse_amount) {
            Some(amount) => amount,
            None => {
                field_errors.push(FieldError::new("amount", "The amount must be a number."));
                0.0
            }
        };

        let description = self.description.unwrap_or_default();
        if description.is_empty() {
            field_errors.push(FieldError::new(
                "description",
                "The description field is required.",
            ));
        } else if description.chars().count() > DESCRIPTION_MAX_CHARS {
            field_errors.push(FieldError::new(
                "description",
                format!("The description may not be greater than {DESCRIPTION_MAX_CHARS} characters."),
            ));
        }

        let account_type = match self.account_type.as_deref().map(str::parse) {
            Some(Ok(account_type)) => account_type,
            Some(Err(_)) | None => {
                field_errors.push(FieldError::new(
                    "accountType",
                    "The selected account type is invalid.",
                ));
                AccountType::Checking
            }
        };

        if !field_errors.is_empty() {
            return Err(Error::Validation(field_errors));
        }

        Ok(NewTransaction {
            user_id,
            amount,
            description,
            account_type,
        })
    }
}

/// Accept a JSON number or a numeric string, rejecting NaN and infinities.
fn parse_amount(value: &Value) -> Option<f64> {
    let amount = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }?;

    amount.is_finite().then_some(amount)
}
