//! API token authentication.
//!
//! Tokens are issued per named device; issuing a token invalidates prior
//! tokens for that device name. Only a SHA-256 digest of the token is kept
//! at rest.

mod endpoints;
mod middleware;
pub(crate) mod token;

pub(crate) use endpoints::{
    issue_token_endpoint, revoke_all_tokens_endpoint, revoke_token_endpoint,
};
pub(crate) use middleware::auth_guard;
pub(crate) use token::{authenticate_token, create_api_token_table};
