//! The transaction feature module.
//!
//! Defines the transaction data model and database queries, request
//! validation, and the HTTP endpoints for creating, listing and fetching
//! transactions.

pub mod core;
mod create_endpoint;
mod get_endpoint;
mod list_endpoint;
mod validate;

pub use core::{
    AccountType, NewTransaction, Transaction, TransactionId, count_transactions,
    create_transaction, get_transaction_with_user, list_transactions,
};
pub(crate) use create_endpoint::create_transaction_endpoint;
pub(crate) use get_endpoint::get_transaction_endpoint;
pub(crate) use list_endpoint::list_transactions_endpoint;
pub(crate) use validate::CreateTransactionRequest;
