//! Defines the core data models and database queries for transactions.

use std::{fmt::Display, str::FromStr};

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::{
    OffsetDateTime, PrimitiveDateTime, format_description::BorrowedFormatItem,
    macros::format_description,
};

use crate::{Error, user::UserID};

/// A database-assigned transaction ID.
pub type TransactionId = i64;

/// The fixed date-time format used for transaction timestamps, both at rest
/// and on the wire, e.g. "2026-08-30 17:45:03".
pub(crate) const DATE_TIME_FORMAT: &[BorrowedFormatItem] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

// ============================================================================
// MODELS
// ============================================================================

/// The kind of account a transaction was recorded against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// An everyday checking account.
    Checking,
    /// A savings account.
    Savings,
    /// A credit card account.
    Credit,
}

impl AccountType {
    /// Every account type, in a fixed order.
    pub const ALL: [AccountType; 3] = [
        AccountType::Checking,
        AccountType::Savings,
        AccountType::Credit,
    ];

    /// The lowercase string used for this account type at rest and on the
    /// wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Checking => "checking",
            AccountType::Savings => "savings",
            AccountType::Credit => "credit",
        }
    }
}

impl Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The error returned when a string is not a valid account type.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("\"{0}\" is not one of checking, savings, credit")]
pub struct ParseAccountTypeError(String);

impl FromStr for AccountType {
    type Err = ParseAccountTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "checking" => Ok(AccountType::Checking),
            "savings" => Ok(AccountType::Savings),
            "credit" => Ok(AccountType::Credit),
            other => Err(ParseAccountTypeError(other.to_owned())),
        }
    }
}

/// A record of money spent or earned against one of a user's accounts.
///
/// Transactions are immutable once created; there is no edit path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction, assigned by the database on creation.
    pub id: TransactionId,
    /// The ID of the user who created the transaction.
    pub user_id: UserID,
    /// The amount of money spent or earned in this transaction.
    pub amount: f64,
    /// A text description of what the transaction was for.
    pub description: String,
    /// The account the transaction was recorded against.
    pub account_type: AccountType,
    /// When the transaction was created, in UTC.
    pub created_at: OffsetDateTime,
}

/// The validated fields for a transaction that has not been persisted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    /// The ID of the user creating the transaction.
    pub user_id: UserID,
    /// The amount of money spent or earned.
    pub amount: f64,
    /// A non-empty description of at most 255 characters.
    pub description: String,
    /// The account the transaction is recorded against.
    pub account_type: AccountType,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create a new transaction in the database.
///
/// The database assigns the ID; the creation timestamp is taken from the
/// clock at the time of the call.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn create_transaction(
    new_transaction: NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let created_at = OffsetDateTime::now_utc();
    let created_at_text = format_date_time(created_at)?;

    let id = connection
        .prepare(
            "INSERT INTO \"transaction\" (user_id, amount, description, account_type, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id",
        )?
        .query_one(
            (
                new_transaction.user_id.as_i64(),
                new_transaction.amount,
                &new_transaction.description,
                new_transaction.account_type.as_str(),
                &created_at_text,
            ),
            |row| row.get(0),
        )?;

    Ok(Transaction {
        id,
        user_id: new_transaction.user_id,
        amount: new_transaction.amount,
        description: new_transaction.description,
        account_type: new_transaction.account_type,
        // Round-trip through the stored text so the in-memory timestamp
        // matches what later reads will see (sub-second precision dropped).
        created_at: parse_date_time(&created_at_text)?,
    })
}

/// Retrieve a transaction and its owner's display name by the transaction
/// `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction_with_user(
    id: TransactionId,
    connection: &Connection,
) -> Result<(Transaction, String), Error> {
    connection
        .prepare(
            "SELECT t.id, t.user_id, t.amount, t.description, t.account_type, t.created_at, u.name
             FROM \"transaction\" t JOIN user u ON t.user_id = u.id
             WHERE t.id = :id",
        )?
        .query_one(&[(":id", &id)], map_transaction_with_user_row)
        .map_err(|error| error.into())
}

/// Get a newest-first page of transactions with their owners' display names.
///
/// `filter` restricts the result to one account type when set.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn list_transactions(
    filter: Option<AccountType>,
    limit: u64,
    offset: u64,
    connection: &Connection,
) -> Result<Vec<(Transaction, String)>, Error> {
    // Newest first; ties on the (second-resolution) timestamp fall back to
    // the ID so the order is stable.
    let query = format!(
        "SELECT t.id, t.user_id, t.amount, t.description, t.account_type, t.created_at, u.name
         FROM \"transaction\" t JOIN user u ON t.user_id = u.id
         {}
         ORDER BY t.created_at DESC, t.id DESC
         LIMIT {limit} OFFSET {offset}",
        match filter {
            Some(_) => "WHERE t.account_type = :account_type",
            None => "",
        }
    );

    let mut statement = connection.prepare(&query)?;

    let rows = match filter {
        Some(account_type) => statement.query_map(
            &[(":account_type", account_type.as_str())],
            map_transaction_with_user_row,
        )?,
        None => statement.query_map([], map_transaction_with_user_row)?,
    };

    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|error| error.into())
}

/// Get the number of transactions matching `filter`.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn count_transactions(
    filter: Option<AccountType>,
    connection: &Connection,
) -> Result<u64, Error> {
    // SQLite reports COUNT as a signed integer, which is never negative.
    let result: Result<i64, _> = match filter {
        Some(account_type) => connection.query_row(
            "SELECT COUNT(id) FROM \"transaction\" WHERE account_type = :account_type",
            &[(":account_type", account_type.as_str())],
            |row| row.get(0),
        ),
        None => connection.query_row("SELECT COUNT(id) FROM \"transaction\"", [], |row| row.get(0)),
    };

    match result {
        Ok(count) => Ok(count as u64),
        Err(error) => Err(error.into()),
    }
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                amount REAL NOT NULL,
                description TEXT NOT NULL,
                account_type TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id)
                )",
        (),
    )?;

    // Covers the filtered newest-first listing.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_account_created
         ON \"transaction\"(account_type, created_at);",
        (),
    )?;

    Ok(())
}

/// Format a timestamp in the application's fixed date-time format.
pub(crate) fn format_date_time(date_time: OffsetDateTime) -> Result<String, Error> {
    date_time
        .format(DATE_TIME_FORMAT)
        .map_err(|error| Error::InvalidDateFormat(error.to_string()))
}

fn parse_date_time(text: &str) -> Result<OffsetDateTime, Error> {
    PrimitiveDateTime::parse(text, DATE_TIME_FORMAT)
        .map(PrimitiveDateTime::assume_utc)
        .map_err(|error| Error::InvalidDateFormat(error.to_string()))
}

fn map_transaction_with_user_row(row: &Row) -> Result<(Transaction, String), rusqlite::Error> {
    let account_type_text: String = row.get(4)?;
    let account_type = account_type_text.parse().map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            Box::new(error),
        )
    })?;

    let created_at_text: String = row.get(5)?;
    let created_at = PrimitiveDateTime::parse(&created_at_text, DATE_TIME_FORMAT)
        .map(PrimitiveDateTime::assume_utc)
        .map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(
                5,
                rusqlite::types::Type::Text,
                Box::new(error),
            )
        })?;

    Ok((
        Transaction {
            id: row.get(0)?,
            user_id: UserID::new(row.get(1)?),
            amount: row.get(2)?,
            description: row.get(3)?,
            account_type,
            created_at,
        },
        row.get(6)?,
    ))
}

// ============================================================================
// TESTS
// ============================================================================
