//! Creation, storage and verification of per-device API tokens.

use rand::distributions::{Alphanumeric, DistString};
use rusqlite::Connection;
use sha2::{Digest, Sha256};
use time::OffsetDateTime;

use crate::{Error, transaction::core::format_date_time, user::UserID};

/// The number of characters in a plain-text token.
const TOKEN_LENGTH: usize = 40;

/// Create the API token table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub(crate) fn create_api_token_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS api_token (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                token_hash TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id)
                )",
        (),
    )?;

    Ok(())
}

/// Hash a plain-text token for storage or lookup.
pub(crate) fn hash_token(plain_token: &str) -> String {
    Sha256::digest(plain_token.as_bytes())
        .iter()
        .fold(String::with_capacity(64), |mut hex, byte| {
            use std::fmt::Write;
            // Writing to a String cannot fail.
            let _ = write!(hex, "{byte:02x}");
            hex
        })
}

/// Issue a new token for `user_id` on the device named `device_name`.
///
/// Any prior tokens for the same device name are deleted first, so each
/// device holds at most one valid token. Returns the plain-text token; only
/// its hash is stored.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub(crate) fn issue_token(
    user_id: UserID,
    device_name: &str,
    connection: &Connection,
) -> Result<String, Error> {
    connection.execute(
        "DELETE FROM api_token WHERE user_id = ?1 AND name = ?2",
        (user_id.as_i64(), device_name),
    )?;

    let plain_token = Alphanumeric.sample_string(&mut rand::thread_rng(), TOKEN_LENGTH);
    let created_at = format_date_time(OffsetDateTime::now_utc())?;

    connection.execute(
        "INSERT INTO api_token (user_id, name, token_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
        (
            user_id.as_i64(),
            device_name,
            hash_token(&plain_token),
            created_at,
        ),
    )?;

    Ok(plain_token)
}

/// Resolve a plain-text token to the user it belongs to.
///
/// # Errors
/// Returns [Error::Unauthorized] if the token is unknown or revoked, or an
/// [Error::SqlError] if there is an SQL error.
pub(crate) fn authenticate_token(
    plain_token: &str,
    connection: &Connection,
) -> Result<UserID, Error> {
    connection
        .prepare("SELECT user_id FROM api_token WHERE token_hash = :token_hash")?
        .query_one(&[(":token_hash", &hash_token(plain_token))], |row| {
            row.get(0).map(UserID::new)
        })
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::Unauthorized,
            error => error.into(),
        })
}

/// Revoke the token with the given hash, if it exists.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub(crate) fn revoke_token_by_hash(token_hash: &str, connection: &Connection) -> Result<(), Error> {
    connection.execute(
        "DELETE FROM api_token WHERE token_hash = ?1",
        (token_hash,),
    )?;

    Ok(())
}

/// Revoke every token belonging to `user_id`.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub(crate) fn revoke_all_tokens(user_id: UserID, connection: &Connection) -> Result<(), Error> {
    connection.execute(
        "DELETE FROM api_token WHERE user_id = ?1",
        (user_id.as_i64(),),
    )?;

    Ok(())
}

#[cfg(test)]
mod token_tests {
    use rusqlite::Connection;

    use crate::{
        Error,
        auth::token::{
            authenticate_token, hash_token, issue_token, revoke_all_tokens, revoke_token_by_hash,
        },
        db::initialize,
        user::{UserID, create_user},
    };

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        create_user("Alice", "alice@example.com", "not-a-real-hash", &conn).unwrap();
        conn
    }

    #[test]
    fn issued_token_authenticates() {
        let conn = get_test_connection();

        let token = issue_token(UserID::new(1), "phone", &conn).unwrap();

        assert_eq!(token.len(), 40);
        assert_eq!(authenticate_token(&token, &conn), Ok(UserID::new(1)));
    }

    #[test]
    fn unknown_token_is_unauthorized() {
        let conn = get_test_connection();

        let result = authenticate_token("definitely-not-a-token", &conn);

        assert_eq!(result, Err(Error::Unauthorized));
    }

    #[test]
    fn reissuing_for_a_device_invalidates_the_prior_token() {
        let conn = get_test_connection();
        let first = issue_token(UserID::new(1), "phone", &conn).unwrap();

        let second = issue_token(UserID::new(1), "phone", &conn).unwrap();

        assert_eq!(authenticate_token(&first, &conn), Err(Error::Unauthorized));
        assert_eq!(authenticate_token(&second, &conn), Ok(UserID::new(1)));
    }

    #[test]
    fn tokens_for_other_devices_survive_reissue() {
        let conn = get_test_connection();
        let laptop = issue_token(UserID::new(1), "laptop", &conn).unwrap();

        issue_token(UserID::new(1), "phone", &conn).unwrap();

        assert_eq!(authenticate_token(&laptop, &conn), Ok(UserID::new(1)));
    }

    #[test]
    fn revoke_by_hash_removes_only_that_token() {
        let conn = get_test_connection();
        let phone = issue_token(UserID::new(1), "phone", &conn).unwrap();
        let laptop = issue_token(UserID::new(1), "laptop", &conn).unwrap();

        revoke_token_by_hash(&hash_token(&phone), &conn).unwrap();

        assert_eq!(authenticate_token(&phone, &conn), Err(Error::Unauthorized));
        assert_eq!(authenticate_token(&laptop, &conn), Ok(UserID::new(1)));
    }

    #[test]
    fn revoke_all_removes_every_token_for_the_user() {
        let conn = get_test_connection();
        create_user("Bob", "bob@example.com", "not-a-real-hash", &conn).unwrap();
        let alice_token = issue_token(UserID::new(1), "phone", &conn).unwrap();
        let bob_token = issue_token(UserID::new(2), "phone", &conn).unwrap();

        revoke_all_tokens(UserID::new(1), &conn).unwrap();

        assert_eq!(
            authenticate_token(&alice_token, &conn),
            Err(Error::Unauthorized)
        );
        assert_eq!(authenticate_token(&bob_token, &conn), Ok(UserID::new(2)));
    }

    #[test]
    fn token_hash_is_stable_hex() {
        let hash = hash_token("abc");

        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
