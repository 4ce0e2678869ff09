//! Defines the endpoint for fetching a single transaction by its ID.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde_json::json;

use crate::{
    AppState,
    broadcast::TransactionNotification,
    transaction::{TransactionId, get_transaction_with_user},
};

/// The state needed to fetch a transaction.
#[derive(Clone)]
pub(crate) struct GetTransactionState {
    /// The database connection for reading transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for GetTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler returning one transaction, in the same projection the
/// live feed uses.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub(crate) async fn get_transaction_endpoint(
    State(state): State<GetTransactionState>,
    Path(transaction_id): Path<TransactionId>,
) -> Response {
    let connection = state.db_connection.lock().unwrap();

    let (transaction, user_name) = match get_transaction_with_user(transaction_id, &connection) {
        Ok(row) => row,
        Err(error) => return error.into_response(),
    };

    match TransactionNotification::from_transaction(&transaction, &user_name) {
        Ok(data) => Json(json!({ "data": data })).into_response(),
        Err(error) => error.into_response(),
    }
}

#[cfg(test)]
mod get_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        extract::{Path, State},
        http::StatusCode,
        response::IntoResponse,
    };
    use rusqlite::Connection;

    use crate::{
        db::initialize,
        transaction::{
            AccountType, NewTransaction, create_transaction,
            get_endpoint::{GetTransactionState, get_transaction_endpoint},
        },
        user::{UserID, create_user},
    };

    fn get_test_state() -> GetTransactionState {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        create_user("Alice", "alice@example.com", "not-a-real-hash", &conn).unwrap();
        create_transaction(
            NewTransaction {
                user_id: UserID::new(1),
                amount: 12.5,
                description: "Coffee beans".to_owned(),
                account_type: AccountType::Credit,
            },
            &conn,
        )
        .unwrap();

        GetTransactionState {
            db_connection: Arc::new(Mutex::new(conn)),
        }
    }

    #[tokio::test]
    async fn returns_the_feed_projection_of_the_transaction() {
        let state = get_test_state();

        let response = get_transaction_endpoint(State(state), Path(1))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(body["data"]["id"], 1);
        assert_eq!(body["data"]["user"], "Alice");
        assert_eq!(body["data"]["amount"], "12.50");
        assert_eq!(body["data"]["description"], "Coffee beans");
        assert_eq!(body["data"]["accountType"], "credit");
    }

    #[tokio::test]
    async fn missing_transaction_returns_not_found() {
        let state = get_test_state();

        let response = get_transaction_endpoint(State(state), Path(999))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
