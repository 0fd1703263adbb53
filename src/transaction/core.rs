//! Defines the core transaction model and its database queries.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{Error, provider::ProviderTransaction};

// ============================================================================
// MODELS
// ============================================================================

/// Alias for the transaction row id type.
pub type TransactionId = i64;

/// An event where money was either spent or earned.
///
/// The amount follows the provider's sign convention: positive amounts are
/// outflows (expenses), negative amounts are inflows (income). The budget
/// aggregates in [crate::transaction] rely on this convention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction row.
    pub id: TransactionId,
    /// The provider's identifier for the transaction.
    ///
    /// `None` for manually entered transactions. For synced transactions this
    /// is the conflict key that makes re-syncing a date window idempotent.
    pub provider_transaction_id: Option<String>,
    /// The provider's identifier for the owning account.
    pub account_id: String,
    /// The amount of money spent or earned in this transaction.
    pub amount: f64,
    /// The enriched primary category, if the provider reported one.
    pub category: Option<String>,
    /// When the transaction happened.
    pub date: Date,
    /// A text description of what the transaction was for.
    pub description: String,
    /// Whether the transaction is still pending settlement.
    pub pending: bool,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the transaction table in the database.
///
/// The provider transaction id carries a UNIQUE constraint: it is the upsert
/// conflict key for synced transactions. The column is nullable so manually
/// entered transactions never collide with each other.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                provider_transaction_id TEXT UNIQUE,
                account_id TEXT NOT NULL,
                amount REAL NOT NULL,
                category TEXT,
                date TEXT NOT NULL,
                description TEXT NOT NULL,
                pending INTEGER NOT NULL
                )",
        (),
    )?;

    // Index used by the date-bounded read path.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_date ON \"transaction\"(date);",
        (),
    )?;

    Ok(())
}

/// Insert or update a batch of synced transactions.
///
/// The conflict key is the provider transaction id, so re-running a sync over
/// an overlapping or identical date window never creates duplicate rows: the
/// later write's field values win. The whole batch is written in one SQL
/// transaction.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn upsert_transactions(
    transactions: &[ProviderTransaction],
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let sql_transaction = connection.unchecked_transaction()?;
    let mut upserted_transactions = Vec::with_capacity(transactions.len());

    {
        let mut statement = sql_transaction.prepare(
            "INSERT INTO \"transaction\"
                (provider_transaction_id, account_id, amount, category, date, description, pending)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(provider_transaction_id) DO UPDATE SET
                account_id = excluded.account_id,
                amount = excluded.amount,
                category = excluded.category,
                date = excluded.date,
                description = excluded.description,
                pending = excluded.pending
             RETURNING id, provider_transaction_id, account_id, amount, category, date, \
                description, pending",
        )?;

        for transaction in transactions {
            let upserted = statement.query_row(
                (
                    &transaction.transaction_id,
                    &transaction.account_id,
                    transaction.amount,
                    &transaction.category,
                    transaction.date,
                    &transaction.description,
                    transaction.pending,
                ),
                map_transaction_row,
            )?;

            upserted_transactions.push(upserted);
        }
    }

    sql_transaction.commit()?;

    Ok(upserted_transactions)
}

/// Create a manually entered transaction, one without a provider transaction
/// id.
///
/// The sync path never produces such rows; they exist so users can record
/// cash spending the provider cannot see.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn create_transaction(
    account_id: &str,
    amount: f64,
    date: Date,
    description: &str,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(
            "INSERT INTO \"transaction\"
                (provider_transaction_id, account_id, amount, category, date, description, pending)
             VALUES (NULL, ?1, ?2, NULL, ?3, ?4, 0)
             RETURNING id, provider_transaction_id, account_id, amount, category, date, \
                description, pending",
        )?
        .query_row((account_id, amount, date, description), map_transaction_row)?;

    Ok(transaction)
}

/// Map a database row to a [Transaction].
pub(crate) fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let id = row.get(0)?;
    let provider_transaction_id = row.get(1)?;
    let account_id = row.get(2)?;
    let amount = row.get(3)?;
    let category = row.get(4)?;
    let date = row.get(5)?;
    let description = row.get(6)?;
    let pending = row.get(7)?;

    Ok(Transaction {
        id,
        provider_transaction_id,
        account_id,
        amount,
        category,
        date,
        description,
        pending,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod database_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{db::initialize, provider::ProviderTransaction};

    use super::{create_transaction, upsert_transactions};

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    fn count_transactions(conn: &Connection) -> u32 {
        conn.query_row("SELECT COUNT(id) FROM \"transaction\";", [], |row| {
            row.get(0)
        })
        .unwrap()
    }

    fn coffee(transaction_id: &str, amount: f64) -> ProviderTransaction {
        ProviderTransaction {
            transaction_id: transaction_id.to_owned(),
            account_id: "acc-1".to_owned(),
            amount,
            category: Some("FOOD_AND_DRINK".to_owned()),
            date: date!(2024 - 01 - 15),
            description: "Coffee shop".to_owned(),
            pending: false,
        }
    }

    #[test]
    fn upsert_twice_creates_no_duplicates() {
        let conn = get_test_connection();
        let batch = vec![coffee("txn-1", 4.5), coffee("txn-2", 12.0)];
        upsert_transactions(&batch, &conn).expect("Could not upsert transactions");

        upsert_transactions(&batch, &conn).expect("Could not upsert transactions");

        assert_eq!(count_transactions(&conn), 2);
    }

    #[test]
    fn distinct_ids_with_identical_fields_persist_separately() {
        let conn = get_test_connection();
        let batch = vec![coffee("txn-1", 4.5), coffee("txn-2", 4.5)];

        let upserted = upsert_transactions(&batch, &conn).expect("Could not upsert transactions");

        assert_eq!(upserted.len(), 2);
        assert_eq!(count_transactions(&conn), 2);
    }

    #[test]
    fn same_id_takes_later_writes_values() {
        let conn = get_test_connection();
        upsert_transactions(&[coffee("txn-1", 4.5)], &conn)
            .expect("Could not upsert transactions");

        let upserted = upsert_transactions(&[coffee("txn-1", 6.0)], &conn)
            .expect("Could not upsert transactions");

        assert_eq!(count_transactions(&conn), 1);
        assert_eq!(upserted[0].amount, 6.0);

        let stored_amount: f64 = conn
            .query_row(
                "SELECT amount FROM \"transaction\" WHERE provider_transaction_id = 'txn-1'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(stored_amount, 6.0);
    }

    #[test]
    fn manual_transactions_do_not_collide() {
        let conn = get_test_connection();
        let today = date!(2024 - 02 - 01);

        create_transaction("acc-1", -20.0, today, "Cash job", &conn)
            .expect("Could not create transaction");
        create_transaction("acc-1", 5.0, today, "Cash coffee", &conn)
            .expect("Could not create transaction");

        assert_eq!(count_transactions(&conn), 2);
    }
}
