//! The persisted transaction projection: models, idempotent writes, the read
//! path with date bounds, and the derived budget aggregates.

mod aggregate;
mod core;
mod query;

pub use aggregate::{total_expenses, total_income};
pub use core::{
    Transaction, TransactionId, create_transaction, create_transaction_table, upsert_transactions,
};
pub use query::{TransactionQuery, TransactionWithAccount, get_transactions};
