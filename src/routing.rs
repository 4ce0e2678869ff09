//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router,
    http::StatusCode,
    middleware,
    response::{Html, IntoResponse, Response},
    routing::{delete, get, post},
};

use crate::{
    AppState,
    auth::{auth_guard, issue_token_endpoint, revoke_all_tokens_endpoint, revoke_token_endpoint},
    broadcast::websocket_endpoint,
    endpoints,
    transaction::{
        create_transaction_endpoint, get_transaction_endpoint, list_transactions_endpoint,
    },
};

/// Return a router with all the app's routes.
///
/// Token issuance and the websocket upgrade are unprotected; the websocket
/// endpoint authenticates its own query-string token since browsers cannot
/// set headers on an upgrade request. Everything else requires a bearer
/// token.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::COFFEE, get(get_coffee))
        .route(endpoints::TOKENS, post(issue_token_endpoint))
        .route(endpoints::WEBSOCKET, get(websocket_endpoint));

    let protected_routes = Router::new()
        .route(endpoints::TOKENS, delete(revoke_token_endpoint))
        .route(endpoints::TOKENS_ALL, delete(revoke_all_tokens_endpoint))
        .route(
            endpoints::TRANSACTIONS,
            get(list_transactions_endpoint).post(create_transaction_endpoint),
        )
        .route(endpoints::TRANSACTION, get(get_transaction_endpoint))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    protected_routes
        .merge(unprotected_routes)
        .layer(middleware::from_fn(crate::logging::logging_middleware))
        .with_state(state)
}

/// Attempt to get a cup of coffee from the server.
async fn get_coffee() -> Response {
    (StatusCode::IM_A_TEAPOT, Html("I'm a teapot")).into_response()
}
