//! HTTP endpoints for issuing and revoking API tokens.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;

use crate::{
    AppState, Error, FieldError,
    auth::{
        middleware::CurrentTokenHash,
        token::{issue_token, revoke_all_tokens, revoke_token_by_hash},
    },
    user::{UserID, get_user_by_email},
};

/// The state needed to issue or revoke tokens.
#[derive(Clone)]
pub(crate) struct TokenState {
    /// The database connection for managing users and tokens.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TokenState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The body of a `POST /api/tokens` request.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenRequest {
    /// The email of the user to issue a token for.
    #[serde(default)]
    pub email: Option<String>,
    /// The user's plain-text password.
    #[serde(default)]
    pub password: Option<String>,
    /// A name identifying the device the token is for, e.g. "alice-phone".
    #[serde(default)]
    pub device_name: Option<String>,
}

impl TokenRequest {
    fn validate(self) -> Result<(String, String, String), Error> {
        let mut field_errors = Vec::new();

        let email = self.email.unwrap_or_default();
        if email.is_empty() {
            field_errors.push(FieldError::new("email", "The email field is required."));
        }

        let password = self.password.unwrap_or_default();
        if password.is_empty() {
            field_errors.push(FieldError::new("password", "The password field is required."));
        }

        let device_name = self.device_name.unwrap_or_default();
        if device_name.is_empty() {
            field_errors.push(FieldError::new(
                "device_name",
                "The device name field is required.",
            ));
        }

        if !field_errors.is_empty() {
            return Err(Error::Validation(field_errors));
        }

        Ok((email, password, device_name))
    }
}

/// A route handler that verifies a user's credentials and issues a fresh API
/// token for the named device, invalidating prior tokens for that device.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub(crate) async fn issue_token_endpoint(
    State(state): State<TokenState>,
    Json(request): Json<TokenRequest>,
) -> Response {
    let (email, password, device_name) = match request.validate() {
        Ok(validated) => validated,
        Err(error) => return error.into_response(),
    };

    let connection = state.db_connection.lock().unwrap();

    let user = match get_user_by_email(&email, &connection) {
        Ok(user) => user,
        // Do not reveal whether the email is registered.
        Err(Error::NotFound) => return Error::InvalidCredentials.into_response(),
        Err(error) => return error.into_response(),
    };

    match bcrypt::verify(&password, &user.password_hash) {
        Ok(true) => {}
        Ok(false) => return Error::InvalidCredentials.into_response(),
        Err(error) => {
            tracing::error!("Unhandled error while verifying credentials: {error}");
            return Error::HashingError(error.to_string()).into_response();
        }
    }

    let plain_token = match issue_token(user.id, &device_name, &connection) {
        Ok(plain_token) => plain_token,
        Err(error) => return error.into_response(),
    };

    Json(json!({
        "token": plain_token,
        "user": {
            "id": user.id,
            "name": user.name,
            "email": user.email,
        },
    }))
    .into_response()
}

/// A route handler that revokes the token used to authenticate the current
/// request.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub(crate) async fn revoke_token_endpoint(
    State(state): State<TokenState>,
    Extension(token_hash): Extension<CurrentTokenHash>,
) -> Response {
    let connection = state.db_connection.lock().unwrap();

    if let Err(error) = revoke_token_by_hash(&token_hash.0, &connection) {
        return error.into_response();
    }

    (
        StatusCode::OK,
        Json(json!({"message": "Token revoked successfully"})),
    )
        .into_response()
}

/// A route handler that revokes every token belonging to the authenticated
/// user.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub(crate) async fn revoke_all_tokens_endpoint(
    State(state): State<TokenState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let connection = state.db_connection.lock().unwrap();

    if let Err(error) = revoke_all_tokens(user_id, &connection) {
        return error.into_response();
    }

    (
        StatusCode::OK,
        Json(json!({"message": "All tokens revoked successfully"})),
    )
        .into_response()
}

#[cfg(test)]
mod token_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
    use rusqlite::Connection;

    use crate::{
        auth::endpoints::{TokenRequest, TokenState, issue_token_endpoint},
        auth::token::authenticate_token,
        db::initialize,
        user::{UserID, create_user},
    };

    fn get_test_state() -> TokenState {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let password_hash = bcrypt::hash("hunter2", 4).unwrap();
        create_user("Alice", "alice@example.com", &password_hash, &conn).unwrap();

        TokenState {
            db_connection: Arc::new(Mutex::new(conn)),
        }
    }

    fn request(email: &str, password: &str) -> TokenRequest {
        TokenRequest {
            email: Some(email.to_owned()),
            password: Some(password.to_owned()),
            device_name: Some("phone".to_owned()),
        }
    }

    #[tokio::test]
    async fn issues_token_for_valid_credentials() {
        let state = get_test_state();

        let response =
            issue_token_endpoint(State(state.clone()), Json(request("alice@example.com", "hunter2")))
                .await
                .into_response();

        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["user"]["name"], "Alice");

        let token = json["token"].as_str().unwrap();
        let connection = state.db_connection.lock().unwrap();
        assert_eq!(
            authenticate_token(token, &connection),
            Ok(UserID::new(1))
        );
    }

    #[tokio::test]
    async fn rejects_wrong_password() {
        let state = get_test_state();

        let response =
            issue_token_endpoint(State(state), Json(request("alice@example.com", "wrong")))
                .await
                .into_response();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn rejects_unknown_email_without_revealing_it() {
        let state = get_test_state();

        let response =
            issue_token_endpoint(State(state), Json(request("mallory@example.com", "hunter2")))
                .await
                .into_response();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            json["errors"]["email"][0],
            "The provided credentials are incorrect."
        );
    }

    #[tokio::test]
    async fn rejects_missing_fields() {
        let state = get_test_state();

        let response = issue_token_endpoint(
            State(state),
            Json(TokenRequest {
                email: None,
                password: None,
                device_name: None,
            }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["errors"]["email"].is_array());
        assert!(json["errors"]["password"].is_array());
        assert!(json["errors"]["device_name"].is_array());
    }
}
