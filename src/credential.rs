//! Defines the access credential model and its database queries.
//!
//! An access credential is the durable secret produced by exchanging a
//! public link token. Each credential is scoped to one linked institution
//! connection ("item") and owned by one user. Credentials are created once,
//! read by the sync engine, and never mutated or exposed over HTTP.

use rusqlite::{Connection, Row};

use crate::{Error, identity::UserId};

/// Alias for the credential row id type.
pub type CredentialId = i64;

/// A long-lived access credential for one linked institution connection.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessCredential {
    /// The ID of the credential row.
    pub id: CredentialId,
    /// The user that linked the institution connection.
    pub user_id: UserId,
    /// The long-lived secret authorizing provider API calls.
    pub access_token: String,
    /// The provider's identifier for the linked institution connection.
    pub item_id: String,
}

/// Create the credential table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_credential_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS credential (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                access_token TEXT NOT NULL,
                item_id TEXT NOT NULL,
                UNIQUE(user_id, item_id)
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_credential_user ON credential(user_id);",
        (),
    )?;

    Ok(())
}

/// Store a newly exchanged access credential for `user_id`.
///
/// Each user holds at most one credential per item: relinking an institution
/// connection the user already has replaces its stored access token in
/// place. Exchanges for distinct items create distinct rows.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn create_credential(
    user_id: &UserId,
    access_token: &str,
    item_id: &str,
    connection: &Connection,
) -> Result<AccessCredential, Error> {
    let credential = connection
        .prepare(
            "INSERT INTO credential (user_id, access_token, item_id)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id, item_id) DO UPDATE SET
                access_token = excluded.access_token
             RETURNING id, user_id, access_token, item_id",
        )?
        .query_row(
            (user_id.as_str(), access_token, item_id),
            map_credential_row,
        )?;

    Ok(credential)
}

/// Retrieve all access credentials belonging to `user_id`.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn get_credentials(
    user_id: &UserId,
    connection: &Connection,
) -> Result<Vec<AccessCredential>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, access_token, item_id FROM credential
             WHERE user_id = :user_id ORDER BY id ASC",
        )?
        .query_map(&[(":user_id", user_id.as_str())], map_credential_row)?
        .map(|maybe_credential| maybe_credential.map_err(Error::SqlError))
        .collect()
}

/// Retrieve the credential for `user_id`'s linked item `item_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the user has no credential for `item_id`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_credential_by_item(
    user_id: &UserId,
    item_id: &str,
    connection: &Connection,
) -> Result<AccessCredential, Error> {
    let credential = connection
        .prepare(
            "SELECT id, user_id, access_token, item_id FROM credential
             WHERE user_id = :user_id AND item_id = :item_id",
        )?
        .query_row(
            &[(":user_id", user_id.as_str()), (":item_id", item_id)],
            map_credential_row,
        )?;

    Ok(credential)
}

fn map_credential_row(row: &Row) -> Result<AccessCredential, rusqlite::Error> {
    let id = row.get(0)?;
    let user_id: String = row.get(1)?;
    let access_token = row.get(2)?;
    let item_id = row.get(3)?;

    Ok(AccessCredential {
        id,
        user_id: UserId::new(user_id),
        access_token,
        item_id,
    })
}

#[cfg(test)]
mod database_tests {
    use rusqlite::Connection;

    use crate::{Error, db::initialize, identity::UserId};

    use super::{create_credential, get_credential_by_item, get_credentials};

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    #[test]
    fn create_returns_stored_credential() {
        let conn = get_test_connection();
        let user = UserId::new("user-1");

        let credential = create_credential(&user, "access-1", "item-1", &conn)
            .expect("Could not create credential");

        assert_eq!(credential.user_id, user);
        assert_eq!(credential.access_token, "access-1");
        assert_eq!(credential.item_id, "item-1");
    }

    #[test]
    fn relinking_an_item_replaces_its_token_in_place() {
        let conn = get_test_connection();
        let user = UserId::new("user-1");
        let original = create_credential(&user, "access-old", "item-1", &conn).unwrap();

        let relinked = create_credential(&user, "access-new", "item-1", &conn)
            .expect("Could not relink item");

        assert_eq!(relinked.id, original.id);
        assert_eq!(relinked.access_token, "access-new");

        let credentials = get_credentials(&user, &conn).expect("Could not get credentials");
        assert_eq!(credentials.len(), 1);
    }

    #[test]
    fn get_credentials_is_scoped_to_user() {
        let conn = get_test_connection();
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");
        create_credential(&alice, "access-1", "item-1", &conn).unwrap();
        create_credential(&alice, "access-2", "item-2", &conn).unwrap();
        create_credential(&bob, "access-3", "item-3", &conn).unwrap();

        let credentials = get_credentials(&alice, &conn).expect("Could not get credentials");

        assert_eq!(credentials.len(), 2);
        assert!(credentials.iter().all(|c| c.user_id == alice));
    }

    #[test]
    fn get_by_item_rejects_other_users() {
        let conn = get_test_connection();
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");
        create_credential(&alice, "access-1", "item-1", &conn).unwrap();

        let result = get_credential_by_item(&bob, "item-1", &conn);

        assert_eq!(result, Err(Error::NotFound));
    }
}
