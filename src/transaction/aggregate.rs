//! Derived budget aggregates over a loaded transaction set.
//!
//! These are pure functions of whatever is currently loaded in memory; they
//! never touch the database.

use super::TransactionWithAccount;

/// Total money spent: the sum of all positive amounts.
pub fn total_expenses(transactions: &[TransactionWithAccount]) -> f64 {
    transactions
        .iter()
        .filter(|transaction| transaction.amount > 0.0)
        .map(|transaction| transaction.amount)
        .sum()
}

/// Total money earned: the sum of the absolute values of all negative
/// amounts.
pub fn total_income(transactions: &[TransactionWithAccount]) -> f64 {
    transactions
        .iter()
        .filter(|transaction| transaction.amount < 0.0)
        .map(|transaction| -transaction.amount)
        .sum()
}
