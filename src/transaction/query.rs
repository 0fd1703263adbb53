//! The read path over the persisted transaction projection.

use rusqlite::{Connection, params_from_iter, types::Value};
use serde::Serialize;
use time::Date;

use crate::Error;

use super::TransactionId;

/// Defines how transactions should be fetched from [get_transactions].
///
/// Both bounds are optional and inclusive; omitting both returns every
/// transaction.
#[derive(Debug, Default, Clone, Copy)]
pub struct TransactionQuery {
    /// Include transactions dated on or after this date.
    pub start: Option<Date>,
    /// Include transactions dated on or before this date.
    pub end: Option<Date>,
}

/// A transaction joined with the display name of its owning bank account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionWithAccount {
    /// The ID of the transaction row.
    pub id: TransactionId,
    /// The provider's identifier for the transaction, if synced.
    pub provider_transaction_id: Option<String>,
    /// The provider's identifier for the owning account.
    pub account_id: String,
    /// The signed amount. Positive is an expense, negative is income.
    pub amount: f64,
    /// The enriched primary category, if present.
    pub category: Option<String>,
    /// When the transaction happened.
    pub date: Date,
    /// A text description of what the transaction was for.
    pub description: String,
    /// Whether the transaction is still pending settlement.
    pub pending: bool,
    /// The display name of the owning bank account, if that account has been
    /// synced.
    pub account_name: Option<String>,
}

/// Query transactions joined with their owning account's display name,
/// ordered by date descending.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn get_transactions(
    query: TransactionQuery,
    connection: &Connection,
) -> Result<Vec<TransactionWithAccount>, Error> {
    let mut query_string_parts = vec![
        "SELECT \"transaction\".id, provider_transaction_id, \"transaction\".account_id, \
            amount, category, date, description, pending, bank_account.name \
            FROM \"transaction\" \
            LEFT JOIN bank_account \
            ON \"transaction\".account_id = bank_account.provider_account_id"
            .to_string(),
    ];
    let mut where_clause_parts = vec![];
    let mut query_parameters = vec![];

    if let Some(start) = query.start {
        where_clause_parts.push(format!("date >= ?{}", query_parameters.len() + 1));
        query_parameters.push(Value::Text(start.to_string()));
    }

    if let Some(end) = query.end {
        where_clause_parts.push(format!("date <= ?{}", query_parameters.len() + 1));
        query_parameters.push(Value::Text(end.to_string()));
    }

    if !where_clause_parts.is_empty() {
        query_string_parts.push(String::from("WHERE ") + &where_clause_parts.join(" AND "));
    }

    // Sort by date, and then ID to keep transaction order stable after
    // overlapping syncs rewrite rows.
    query_string_parts.push("ORDER BY date DESC, \"transaction\".id ASC".to_string());

    let query_string = query_string_parts.join(" ");
    let params = params_from_iter(query_parameters.iter());

    connection
        .prepare(&query_string)?
        .query_map(params, |row| {
            Ok(TransactionWithAccount {
                id: row.get(0)?,
                provider_transaction_id: row.get(1)?,
                account_id: row.get(2)?,
                amount: row.get(3)?,
                category: row.get(4)?,
                date: row.get(5)?,
                description: row.get(6)?,
                pending: row.get(7)?,
                account_name: row.get(8)?,
            })
        })?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::SqlError))
        .collect()
}
