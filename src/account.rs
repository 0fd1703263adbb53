//! Defines the bank account model and its database queries.

use rusqlite::{Connection, Row};
use serde::Serialize;

use crate::{Error, provider::ProviderAccount};

/// Alias for the bank account row id type.
pub type BankAccountId = i64;

/// A bank account imported from the financial data provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BankAccount {
    /// The ID of the account row.
    pub id: BankAccountId,
    /// The provider's identifier for the account.
    pub provider_account_id: String,
    /// The account's display name.
    pub name: String,
    /// The last few digits of the account number, if reported.
    pub mask: Option<String>,
    /// The account's type classification, e.g. "depository".
    pub kind: String,
    /// The account's subtype classification, e.g. "checking".
    pub subtype: Option<String>,
}

/// Create the bank account table in the database.
///
/// The provider account id carries a UNIQUE constraint so that re-syncing the
/// account list upserts rather than duplicating rows.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_bank_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS bank_account (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                provider_account_id TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                mask TEXT,
                kind TEXT NOT NULL,
                subtype TEXT
                )",
        (),
    )?;

    Ok(())
}

/// Insert or update the bank accounts reported by the provider.
///
/// The conflict key is the provider account id: syncing the same account list
/// twice updates the existing rows in place instead of inserting duplicates.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn upsert_accounts(
    accounts: &[ProviderAccount],
    connection: &Connection,
) -> Result<Vec<BankAccount>, Error> {
    let sql_transaction = connection.unchecked_transaction()?;
    let mut upserted_accounts = Vec::with_capacity(accounts.len());

    {
        let mut statement = sql_transaction.prepare(
            "INSERT INTO bank_account (provider_account_id, name, mask, kind, subtype)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(provider_account_id) DO UPDATE SET
                name = excluded.name,
                mask = excluded.mask,
                kind = excluded.kind,
                subtype = excluded.subtype
             RETURNING id, provider_account_id, name, mask, kind, subtype",
        )?;

        for account in accounts {
            let upserted = statement.query_row(
                (
                    &account.account_id,
                    &account.name,
                    &account.mask,
                    &account.kind,
                    &account.subtype,
                ),
                map_bank_account_row,
            )?;

            upserted_accounts.push(upserted);
        }
    }

    sql_transaction.commit()?;

    Ok(upserted_accounts)
}

fn map_bank_account_row(row: &Row) -> Result<BankAccount, rusqlite::Error> {
    let id = row.get(0)?;
    let provider_account_id = row.get(1)?;
    let name = row.get(2)?;
    let mask = row.get(3)?;
    let kind = row.get(4)?;
    let subtype = row.get(5)?;

    Ok(BankAccount {
        id,
        provider_account_id,
        name,
        mask,
        kind,
        subtype,
    })
}

#[cfg(test)]
mod database_tests {
    use rusqlite::Connection;

    use crate::{db::initialize, provider::ProviderAccount};

    use super::upsert_accounts;

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    fn count_accounts(conn: &Connection) -> u32 {
        conn.query_row("SELECT COUNT(id) FROM bank_account;", [], |row| row.get(0))
            .unwrap()
    }

    fn checking_account(account_id: &str, name: &str) -> ProviderAccount {
        ProviderAccount {
            account_id: account_id.to_owned(),
            name: name.to_owned(),
            mask: Some("1234".to_owned()),
            kind: "depository".to_owned(),
            subtype: Some("checking".to_owned()),
        }
    }

    #[test]
    fn upsert_inserts_new_accounts() {
        let conn = get_test_connection();
        let accounts = vec![
            checking_account("acc-1", "Everyday Checking"),
            checking_account("acc-2", "Savings"),
        ];

        let upserted = upsert_accounts(&accounts, &conn).expect("Could not upsert accounts");

        assert_eq!(upserted.len(), 2);
        assert_eq!(count_accounts(&conn), 2);
    }

    #[test]
    fn upsert_twice_does_not_duplicate() {
        let conn = get_test_connection();
        let accounts = vec![checking_account("acc-1", "Everyday Checking")];
        upsert_accounts(&accounts, &conn).expect("Could not upsert accounts");

        let renamed = vec![checking_account("acc-1", "Spending")];
        let upserted = upsert_accounts(&renamed, &conn).expect("Could not upsert accounts");

        assert_eq!(count_accounts(&conn), 1);
        assert_eq!(upserted[0].name, "Spending");
    }
}
