//! Route handlers for account sync and sync status.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    account::BankAccount,
    credential::get_credential_by_item,
    identity::AuthenticatedUser,
    state::AppState,
    sync::{SyncStatus, sync_accounts},
};

/// The request body for syncing a linked item's bank accounts.
#[derive(Debug, Serialize, Deserialize)]
pub struct SyncAccountsBody {
    /// The provider's identifier for the linked institution connection.
    pub item_id: String,
}

/// A route handler for syncing the bank accounts of one of the user's linked
/// items.
///
/// The item's access credential is looked up server-side; access tokens never
/// travel over this API.
///
/// # Panics
/// Panics if the lock for the database connection is already held by the same
/// thread.
pub async fn sync_accounts_endpoint(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(body): Json<SyncAccountsBody>,
) -> Result<Json<Vec<BankAccount>>, Error> {
    let access_token = {
        let connection = state.db_connection.lock().unwrap();
        get_credential_by_item(&user, &body.item_id, &connection)?.access_token
    };

    let accounts = sync_accounts(&state, &access_token).await?;

    Ok(Json(accounts))
}

/// A route handler for reading the sync engine's loading/error status.
///
/// # Panics
/// Panics if the lock for the sync status is already held by the same thread.
pub async fn get_sync_status_endpoint(State(state): State<AppState>) -> Json<SyncStatus> {
    let status = state.sync_status.lock().unwrap().clone();

    Json(status)
}
