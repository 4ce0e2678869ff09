//! Middleware that guards routes behind bearer token authentication.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use rusqlite::Connection;

use crate::{AppState, Error, auth::token::authenticate_token, auth::token::hash_token};

/// The hash of the token that authenticated the current request.
///
/// Inserted as a request extension so the revocation endpoint can delete
/// exactly the token that was presented.
#[derive(Debug, Clone)]
pub(crate) struct CurrentTokenHash(pub(crate) String);

/// The state needed for the auth middleware.
#[derive(Clone)]
pub(crate) struct AuthState {
    /// The database connection for looking up tokens.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Middleware function that checks for a valid `Authorization: Bearer` token.
///
/// On success the request continues with the token owner's [crate::UserID]
/// and the [CurrentTokenHash] available as request extensions; otherwise the
/// request is rejected with a 401 response.
///
/// **Note**: Route handlers can use the function argument
/// `Extension(user_id): Extension<UserID>` to receive the user ID.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub(crate) async fn auth_guard(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(bearer) = request.headers().typed_get::<Authorization<Bearer>>() else {
        return Error::Unauthorized.into_response();
    };

    let user_id = {
        let connection = state.db_connection.lock().unwrap();

        match authenticate_token(bearer.token(), &connection) {
            Ok(user_id) => user_id,
            Err(error) => {
                if error != Error::Unauthorized {
                    tracing::error!("token lookup failed: {error}");
                }
                return Error::Unauthorized.into_response();
            }
        }
    };

    request.extensions_mut().insert(user_id);
    request
        .extensions_mut()
        .insert(CurrentTokenHash(hash_token(bearer.token())));

    next.run(request).await
}
