//! The transaction synchronization engine.
//!
//! Exchanges link tokens for durable access credentials, pulls accounts and
//! transactions from the financial data provider, and reconciles them into
//! the database. The orchestrated refresh fans out one transaction sync per
//! linked credential concurrently and reports a per-credential outcome.

use std::collections::BTreeMap;

use futures::future::join_all;
use serde::Serialize;
use time::Date;

use crate::{
    Error,
    account::{BankAccount, upsert_accounts},
    credential::{create_credential, get_credentials},
    identity::UserId,
    state::AppState,
    transaction::{Transaction, upsert_transactions},
};

mod window;

pub use window::sync_window;

/// The observable loading/error state of the sync engine.
///
/// `loading` is set before the first provider call of a refresh and cleared
/// once every credential's sync has settled. `error` carries a user-facing
/// message on failure and is cleared at the start of the next attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncStatus {
    /// Whether a refresh is currently in flight.
    pub loading: bool,
    /// A user-facing message describing the last failure, if any.
    pub error: Option<String>,
}

impl SyncStatus {
    fn begin(&mut self) {
        self.loading = true;
        self.error = None;
    }

    fn settle(&mut self, error: Option<&str>) {
        self.loading = false;
        self.error = error.map(ToOwned::to_owned);
    }
}

/// The per-credential results of an orchestrated refresh, keyed by item id.
///
/// A user holds at most one credential per item (relinking replaces the
/// stored token in place), so every credential's result lands on its own
/// key. Partial failure is visible here: transactions from credentials that
/// synced successfully are durably written even when other credentials
/// failed.
#[derive(Debug, PartialEq)]
pub struct RefreshOutcome {
    /// The number of transactions synced, or the error that stopped the sync,
    /// for each of the user's linked items.
    pub outcomes: BTreeMap<String, Result<usize, Error>>,
}

impl RefreshOutcome {
    /// Whether every credential synced without error.
    pub fn is_success(&self) -> bool {
        self.outcomes.values().all(Result::is_ok)
    }
}

/// Create a short-lived link token for `user_id` to start the client-side
/// linking flow.
///
/// # Errors
/// Returns an [Error::Provider] if the provider call fails.
pub async fn create_link_token(state: &AppState, user_id: &UserId) -> Result<String, Error> {
    state.provider.create_link_token(user_id.as_str()).await
}

/// Exchange a single-use public token for an access credential and persist it
/// scoped to `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::EmptyPublicToken] if `public_token` is empty, without contacting
///   the provider,
/// - [Error::Provider] if the exchange fails (a replayed public token fails
///   here, tokens are single-use),
/// - or [Error::SqlError] if the credential cannot be stored.
///
/// # Panics
/// Panics if the lock for the database connection is already held by the same
/// thread.
pub async fn link_item(
    state: &AppState,
    user_id: &UserId,
    public_token: &str,
) -> Result<(), Error> {
    if public_token.trim().is_empty() {
        return Err(Error::EmptyPublicToken);
    }

    let exchange = state.provider.exchange_public_token(public_token).await?;

    let connection = state.db_connection.lock().unwrap();
    create_credential(user_id, &exchange.access_token, &exchange.item_id, &connection)?;

    tracing::info!("linked item {}", exchange.item_id);

    Ok(())
}

/// Fetch the bank accounts visible under `access_token` and upsert them into
/// the database.
///
/// The upsert is keyed on the provider account id, so re-syncing the same
/// credential updates display fields in place instead of duplicating rows.
///
/// # Errors
/// Returns an [Error::Provider] if the provider call fails, or an
/// [Error::SqlError] if the accounts cannot be stored.
///
/// # Panics
/// Panics if the lock for the database connection is already held by the same
/// thread.
pub async fn sync_accounts(
    state: &AppState,
    access_token: &str,
) -> Result<Vec<BankAccount>, Error> {
    let accounts = state.provider.get_accounts(access_token).await?;

    let connection = state.db_connection.lock().unwrap();
    let accounts = upsert_accounts(&accounts, &connection)?;

    tracing::info!("synced {} bank accounts", accounts.len());

    Ok(accounts)
}

/// Fetch transactions for `access_token` dated within `[start_date,
/// end_date]` (inclusive) and reconcile them into the database.
///
/// The upsert is keyed on the provider transaction id, so re-running the same
/// or an overlapping window never creates duplicates; the later run's values
/// win.
///
/// # Errors
/// Returns an [Error::Provider] if the provider call fails, or an
/// [Error::SqlError] if the transactions cannot be stored.
///
/// # Panics
/// Panics if the lock for the database connection is already held by the same
/// thread.
pub async fn sync_transactions(
    state: &AppState,
    access_token: &str,
    start_date: Date,
    end_date: Date,
) -> Result<Vec<Transaction>, Error> {
    let transactions = state
        .provider
        .get_transactions(access_token, start_date, end_date)
        .await?;

    let connection = state.db_connection.lock().unwrap();
    upsert_transactions(&transactions, &connection)
}

/// Sync transactions for every credential belonging to `user_id` over the
/// trailing 30-day window ending on `today`.
///
/// The per-credential syncs run concurrently and every sync is allowed to
/// settle; transactions from successful credentials are durably written even
/// when others fail. The returned [RefreshOutcome] reports each credential's
/// result so callers can distinguish full from partial failure.
///
/// # Errors
/// This function will return a:
/// - [Error::RefreshInFlight] if another refresh is still in progress,
/// - [Error::NoLinkedAccounts] if the user has no stored credentials (the
///   provider is never contacted in this case),
/// - or [Error::SqlError] if the credentials cannot be read.
///
/// # Panics
/// Panics if the lock for the database connection or sync status is already
/// held by the same thread.
pub async fn refresh_transactions(
    state: &AppState,
    user_id: &UserId,
    today: Date,
) -> Result<RefreshOutcome, Error> {
    let _guard = state
        .refresh_guard
        .try_lock()
        .map_err(|_| Error::RefreshInFlight)?;

    state.sync_status.lock().unwrap().begin();

    let result = run_refresh(state, user_id, today).await;

    let mut status = state.sync_status.lock().unwrap();
    match &result {
        Ok(outcome) if outcome.is_success() => status.settle(None),
        Ok(_) => status.settle(Some("Failed to refresh transactions")),
        Err(Error::NoLinkedAccounts) => status.settle(Some("No linked accounts found")),
        Err(_) => status.settle(Some("Failed to refresh transactions")),
    }

    result
}

async fn run_refresh(
    state: &AppState,
    user_id: &UserId,
    today: Date,
) -> Result<RefreshOutcome, Error> {
    let credentials = {
        let connection = state.db_connection.lock().unwrap();
        get_credentials(user_id, &connection)?
    };

    if credentials.is_empty() {
        return Err(Error::NoLinkedAccounts);
    }

    let window = sync_window(today);
    let (start_date, end_date) = (*window.start(), *window.end());

    let syncs = credentials.into_iter().map(|credential| async move {
        let result = sync_transactions(state, &credential.access_token, start_date, end_date)
            .await
            .map(|transactions| transactions.len());

        if let Err(error) = &result {
            tracing::error!(
                "failed to sync transactions for item {}: {}",
                credential.item_id,
                error
            );
        }

        (credential.item_id, result)
    });

    let outcomes: BTreeMap<_, _> = join_all(syncs).await.into_iter().collect();

    let synced: usize = outcomes.values().filter_map(|r| r.as_ref().ok()).sum();
    tracing::info!(
        "refresh settled: {} transactions across {} items",
        synced,
        outcomes.len()
    );

    Ok(RefreshOutcome {
        outcomes,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod link_tests {
    use crate::{
        Error,
        credential::get_credentials,
        identity::UserId,
        sync::{create_link_token, link_item},
        test_utils::{FakeProvider, test_state},
    };

    #[tokio::test]
    async fn link_item_persists_credential() {
        let (state, _provider) = test_state(FakeProvider::new());
        let user = UserId::new("user-1");

        link_item(&state, &user, "public-1")
            .await
            .expect("Could not link item");

        let connection = state.db_connection.lock().unwrap();
        let credentials = get_credentials(&user, &connection).unwrap();
        assert_eq!(credentials.len(), 1);
        assert_eq!(credentials[0].access_token, "access-public-1");
        assert_eq!(credentials[0].item_id, "item-public-1");
    }

    #[tokio::test]
    async fn empty_public_token_is_rejected_before_the_provider() {
        let (state, provider) = test_state(FakeProvider::new());
        let user = UserId::new("user-1");

        let result = link_item(&state, &user, "  ").await;

        assert_eq!(result, Err(Error::EmptyPublicToken));
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn repeated_links_create_distinct_credentials() {
        let (state, _provider) = test_state(FakeProvider::new());
        let user = UserId::new("user-1");

        link_item(&state, &user, "public-1").await.unwrap();
        link_item(&state, &user, "public-2").await.unwrap();

        let connection = state.db_connection.lock().unwrap();
        let credentials = get_credentials(&user, &connection).unwrap();
        assert_eq!(credentials.len(), 2);
    }

    #[tokio::test]
    async fn link_token_is_scoped_to_the_user() {
        let (state, _provider) = test_state(FakeProvider::new());

        let link_token = create_link_token(&state, &UserId::new("user-1"))
            .await
            .expect("Could not create link token");

        assert_eq!(link_token, "link-sandbox-user-1");
    }
}
