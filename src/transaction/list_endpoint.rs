//! Defines the endpoint for listing transactions, newest first.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;

use crate::{
    AppState, Error,
    broadcast::TransactionNotification,
    pagination::{PaginationConfig, page_meta, page_offset},
    transaction::{AccountType, count_transactions, list_transactions},
};

/// The state needed to list transactions.
#[derive(Clone)]
pub(crate) struct ListTransactionsState {
    /// The database connection for reading transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The config that controls the page size.
    pub pagination_config: PaginationConfig,
}

impl FromRef<AppState> for ListTransactionsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            pagination_config: state.pagination_config.clone(),
        }
    }
}

/// The query parameters accepted by the list endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct ListQuery {
    /// Restrict the list to one account type.
    #[serde(default, rename = "accountType")]
    pub account_type: Option<String>,
    /// The 1-based page to return, defaulting to the first.
    #[serde(default)]
    pub page: Option<u64>,
}

/// A route handler returning a newest-first page of transactions.
///
/// Each row uses the same projection as the live-feed notification, so a
/// client can mix page loads and notifications in one list.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub(crate) async fn list_transactions_endpoint(
    State(state): State<ListTransactionsState>,
    Query(query): Query<ListQuery>,
) -> Response {
    let filter = match query.account_type.as_deref() {
        None | Some("") => None,
        Some(raw) => match raw.parse::<AccountType>() {
            Ok(account_type) => Some(account_type),
            Err(_) => {
                return Error::validation("accountType", "The selected account type is invalid.")
                    .into_response();
            }
        },
    };

    let page = query.page.unwrap_or(1).max(1);
    let per_page = state.pagination_config.per_page;

    let connection = state.db_connection.lock().unwrap();

    let total = match count_transactions(filter, &connection) {
        Ok(total) => total,
        Err(error) => return error.into_response(),
    };

    let rows = match list_transactions(filter, per_page, page_offset(page, per_page), &connection)
    {
        Ok(rows) => rows,
        Err(error) => return error.into_response(),
    };

    let mut data = Vec::with_capacity(rows.len());
    for (transaction, user_name) in &rows {
        match TransactionNotification::from_transaction(transaction, user_name) {
            Ok(row) => data.push(row),
            Err(error) => return error.into_response(),
        }
    }

    Json(json!({
        "data": data,
        "meta": page_meta(page, per_page, total),
    }))
    .into_response()
}
