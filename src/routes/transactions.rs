//! Route handlers for reading and refreshing transactions.

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    identity::AuthenticatedUser,
    state::AppState,
    sync::{RefreshOutcome, refresh_transactions},
    transaction::{
        Transaction, TransactionQuery, TransactionWithAccount, create_transaction,
        get_transactions, total_expenses, total_income,
    },
};

/// The optional inclusive date bounds for the transaction read path.
#[derive(Debug, Default, Deserialize)]
pub struct TransactionParams {
    /// Include transactions dated on or after this date.
    pub start: Option<Date>,
    /// Include transactions dated on or before this date.
    pub end: Option<Date>,
}

/// The response body for the transaction read path.
#[derive(Debug, Serialize)]
pub struct TransactionListBody {
    /// The matching transactions, ordered by date descending.
    pub transactions: Vec<TransactionWithAccount>,
    /// The sum of all positive amounts in `transactions`.
    pub total_expenses: f64,
    /// The sum of the absolute values of all negative amounts in
    /// `transactions`.
    pub total_income: f64,
}

/// The request body for recording a manually entered transaction.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateTransactionBody {
    /// The provider's identifier for the owning account.
    pub account_id: String,
    /// The signed amount. Positive is an expense, negative is income.
    pub amount: f64,
    /// When the transaction happened.
    pub date: Date,
    /// A text description of what the transaction was for.
    pub description: String,
}

/// The per-item result of an orchestrated refresh.
#[derive(Debug, Serialize)]
pub struct ItemOutcomeBody {
    /// The number of transactions synced, when the item's sync succeeded.
    pub synced: Option<usize>,
    /// A description of the failure, when the item's sync failed.
    pub error: Option<String>,
}

/// The response body for an orchestrated refresh.
#[derive(Debug, Serialize)]
pub struct RefreshBody {
    /// Whether every linked item synced without error.
    pub success: bool,
    /// The outcome for each of the user's linked items, keyed by item id.
    pub items: BTreeMap<String, ItemOutcomeBody>,
    /// The post-sync transaction list, present only on full success.
    pub transactions: Option<Vec<TransactionWithAccount>>,
}

/// A route handler for reading transactions with optional inclusive date
/// bounds, along with the derived budget aggregates.
///
/// # Panics
/// Panics if the lock for the database connection is already held by the same
/// thread.
pub async fn get_transactions_endpoint(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Query(params): Query<TransactionParams>,
) -> Result<Json<TransactionListBody>, Error> {
    let connection = state.db_connection.lock().unwrap();
    let transactions = get_transactions(
        TransactionQuery {
            start: params.start,
            end: params.end,
        },
        &connection,
    )?;

    Ok(Json(TransactionListBody {
        total_expenses: total_expenses(&transactions),
        total_income: total_income(&transactions),
        transactions,
    }))
}

/// A route handler for recording a manually entered transaction, one the
/// provider cannot see (e.g. cash spending).
///
/// The stored row has no provider transaction id, so it can never be
/// overwritten by a later sync.
///
/// # Panics
/// Panics if the lock for the database connection is already held by the same
/// thread.
pub async fn create_transaction_endpoint(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Json(body): Json<CreateTransactionBody>,
) -> Result<(StatusCode, Json<Transaction>), Error> {
    let connection = state.db_connection.lock().unwrap();
    let transaction = create_transaction(
        &body.account_id,
        body.amount,
        body.date,
        &body.description,
        &connection,
    )?;

    Ok((StatusCode::CREATED, Json(transaction)))
}

/// A route handler for the orchestrated transaction refresh.
///
/// On full success the response carries the post-sync transaction list, so
/// clients always observe the refreshed data. On partial failure the
/// successful items' transactions are still persisted, but the response
/// reports failure per item and returns `502 Bad Gateway`.
///
/// # Panics
/// Panics if the lock for the database connection is already held by the same
/// thread.
pub async fn refresh_transactions_endpoint(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<(StatusCode, Json<RefreshBody>), Error> {
    let today = OffsetDateTime::now_utc().date();

    let outcome = refresh_transactions(&state, &user, today).await?;
    let success = outcome.is_success();

    let transactions = if success {
        let connection = state.db_connection.lock().unwrap();
        Some(get_transactions(TransactionQuery::default(), &connection)?)
    } else {
        None
    };

    let status = if success {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };

    Ok((
        status,
        Json(RefreshBody {
            success,
            items: item_outcomes(outcome),
            transactions,
        }),
    ))
}

/// Flatten a [RefreshOutcome] into response bodies, replacing raw error
/// detail with a client-safe description.
fn item_outcomes(outcome: RefreshOutcome) -> BTreeMap<String, ItemOutcomeBody> {
    outcome
        .outcomes
        .into_iter()
        .map(|(item_id, result)| {
            let body = match result {
                Ok(synced) => ItemOutcomeBody {
                    synced: Some(synced),
                    error: None,
                },
                Err(_) => ItemOutcomeBody {
                    synced: None,
                    error: Some("failed to sync transactions for this item".to_owned()),
                },
            };

            (item_id, body)
        })
        .collect()
}
