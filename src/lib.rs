//! Ledgerfeed is a demonstration finance tracker: authenticated users record
//! transactions and watch a shared, filterable list update in real time.
//!
//! This library provides a JSON REST API plus a WebSocket feed that fans out
//! new-transaction notifications to every subscribed client except the one
//! that performed the write.

#![warn(missing_docs)]

use std::{collections::BTreeMap, net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod app_state;
mod auth;
mod broadcast;
mod db;
mod endpoints;
mod feed;
mod logging;
mod pagination;
mod routing;
mod transaction;
mod user;

pub use app_state::AppState;
pub use broadcast::{
    BroadcastHub, ServerFrame, SocketId, Subscription, TRANSACTIONS_TOPIC, TransactionNotification,
};
pub use db::initialize as initialize_db;
pub use feed::{FeedHandle, FeedState, spawn_feed};
pub use logging::logging_middleware;
pub use pagination::PaginationConfig;
pub use routing::build_router;
pub use transaction::{AccountType, NewTransaction, Transaction, TransactionId, create_transaction};
pub use user::{User, UserID, create_user};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// A single validation failure, naming the request field that caused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// The name of the offending request field, e.g. "description".
    pub field: &'static str,
    /// A human-readable explanation of what is wrong with the field.
    pub message: String,
}

impl FieldError {
    /// Create a validation failure for `field`.
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// One or more request fields failed validation. No write occurred.
    #[error("the given data was invalid")]
    Validation(Vec<FieldError>),

    /// The user provided an email/password pair that does not match a
    /// registered user.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The request did not carry a valid API token.
    #[error("missing or invalid API token")]
    Unauthorized,

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// A timestamp could not be formatted for the wire.
    #[error("could not format date-time: {0}")]
    InvalidDateFormat(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl Error {
    /// Shortcut for an [Error::Validation] with a single offending field.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Error::Validation(vec![FieldError::new(field, message)])
    }
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::Validation(field_errors) => validation_response(field_errors),
            Error::InvalidCredentials => validation_response(vec![FieldError::new(
                "email",
                "The provided credentials are incorrect.",
            )]),
            Error::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({"message": "Unauthenticated."})),
            )
                .into_response(),
            Error::NotFound => {
                (StatusCode::NOT_FOUND, Json(json!({"message": "Not Found"}))).into_response()
            }
            // Any errors that are not handled above are not intended to be
            // shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"message": "Internal Server Error"})),
                )
                    .into_response()
            }
        }
    }
}

/// Render field errors as a 422 response with a body that groups messages by
/// field name.
fn validation_response(field_errors: Vec<FieldError>) -> Response {
    let mut errors: BTreeMap<&'static str, Vec<String>> = BTreeMap::new();

    for field_error in field_errors {
        errors
            .entry(field_error.field)
            .or_default()
            .push(field_error.message);
    }

    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({
            "message": "The given data was invalid.",
            "errors": errors,
        })),
    )
        .into_response()
}
