//! Defines the endpoint for creating a new transaction.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde_json::json;

use crate::{
    AppState,
    broadcast::{BroadcastHub, SocketId, format_amount, publish_new_transaction},
    endpoints::{self, format_endpoint},
    transaction::{CreateTransactionRequest, create_transaction},
    user::{UserID, get_user_by_id},
};

/// The request header carrying the writer's own feed connection ID, so the
/// notification for this write is broadcast to everyone but them.
pub(crate) const SOCKET_ID_HEADER: &str = "X-Socket-Id";

/// The state needed to create a transaction.
#[derive(Clone)]
pub(crate) struct CreateTransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The hub to publish the new-transaction notification to.
    pub hub: Arc<BroadcastHub>,
}

impl FromRef<AppState> for CreateTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            hub: state.hub.clone(),
        }
    }
}

/// A route handler for creating a new transaction.
///
/// On success the transaction is persisted, a notification is published to
/// every feed subscriber except the writer's own connection, and a 201
/// response echoes the created transaction with a `Location` header pointing
/// at it. Validation failures return a 422
/// naming the offending fields and persist nothing.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub(crate) async fn create_transaction_endpoint(
    State(state): State<CreateTransactionState>,
    Extension(user_id): Extension<UserID>,
    headers: HeaderMap,
    Json(request): Json<CreateTransactionRequest>,
) -> Response {
    let new_transaction = match request.validate(user_id) {
        Ok(new_transaction) => new_transaction,
        Err(error) => return error.into_response(),
    };

    let exclude_socket = socket_id_from_headers(&headers);

    let (transaction, user_name) = {
        let connection = state.db_connection.lock().unwrap();

        let transaction = match create_transaction(new_transaction, &connection) {
            Ok(transaction) => transaction,
            Err(error) => return error.into_response(),
        };

        let user_name = match get_user_by_id(user_id, &connection) {
            Ok(user) => user.name,
            Err(error) => return error.into_response(),
        };

        (transaction, user_name)
    };

    // The write has committed; fan-out happens outside the database lock and
    // cannot fail the request.
    publish_new_transaction(&state.hub, &transaction, &user_name, exclude_socket);

    (
        StatusCode::CREATED,
        [(
            header::LOCATION,
            format_endpoint(endpoints::TRANSACTION, transaction.id),
        )],
        Json(json!({
            "message": "Transaction created successfully",
            "transaction": {
                "id": transaction.id,
                "amount": format_amount(transaction.amount),
                "description": transaction.description,
                "accountType": transaction.account_type,
            },
        })),
    )
        .into_response()
}

/// Read the writer's socket ID from the request headers, if present and
/// well-formed.
fn socket_id_from_headers(headers: &HeaderMap) -> Option<SocketId> {
    let raw = headers.get(SOCKET_ID_HEADER)?.to_str().ok()?;

    match raw.parse() {
        Ok(id) => Some(SocketId::from_u64(id)),
        Err(_) => {
            tracing::debug!("ignoring malformed {SOCKET_ID_HEADER} header: {raw:?}");
            None
        }
    }
}
