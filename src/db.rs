//! Database initialization for the application's SQLite store.

use rusqlite::{Connection, Transaction as SqlTransaction};

use crate::{Error, auth::create_api_token_table, transaction::core::create_transaction_table, user::create_user_table};

/// Create the application's tables if they do not exist yet.
///
/// The tables are created within a single exclusive SQL transaction so that
/// a concurrent initializer sees either none or all of them.
///
/// # Errors
/// Returns an [Error::SqlError] if a table could not be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    let sql_transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Exclusive)?;

    create_user_table(&sql_transaction)?;
    create_api_token_table(&sql_transaction)?;
    create_transaction_table(&sql_transaction)?;

    sql_transaction.commit()?;

    Ok(())
}

#[cfg(test)]
mod db_tests {
    use rusqlite::Connection;

    use crate::db::initialize;

    #[test]
    fn initialize_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        initialize(&conn).expect("first initialize failed");
        initialize(&conn).expect("second initialize failed");
    }
}
