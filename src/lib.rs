//! Spendplan is a personal-finance service that links bank accounts through a
//! Plaid-style aggregation API and imports transaction history into a local
//! SQLite database.
//!
//! The heart of the library is the sync engine: exchanging link tokens for
//! access credentials, pulling accounts and transactions from the financial
//! data provider, and reconciling them into the database with idempotent
//! upserts. A thin JSON API exposes the engine to clients; user identity is
//! delegated to an upstream identity proxy.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde::Serialize;
use tokio::signal;

mod account;
mod credential;
mod db;
mod identity;
mod provider;
mod routes;
mod state;
mod sync;
mod transaction;

#[cfg(test)]
mod test_utils;

pub use account::BankAccount;
pub use credential::AccessCredential;
pub use db::initialize as initialize_db;
pub use identity::UserId;
pub use provider::{
    FinancialProvider, PlaidClient, PlaidEnvironment, ProviderAccount, ProviderTransaction,
    TokenExchange,
};
pub use routes::build_router;
pub use state::AppState;
pub use sync::{
    RefreshOutcome, SyncStatus, create_link_token, link_item, refresh_transactions, sync_accounts,
    sync_transactions, sync_window,
};
pub use transaction::{
    Transaction, TransactionQuery, TransactionWithAccount, create_transaction, get_transactions,
    total_expenses, total_income,
};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A call to the external financial data provider failed.
    ///
    /// The message carries the underlying provider/network detail and should
    /// only be logged on the server, not sent to clients.
    #[error("provider call failed: {0}")]
    Provider(String),

    /// A refresh was requested but the user has no stored access credentials.
    ///
    /// The provider is never contacted in this case.
    #[error("no linked accounts found")]
    NoLinkedAccounts,

    /// A refresh was requested while another refresh was still in flight.
    #[error("a transaction refresh is already in progress")]
    RefreshInFlight,

    /// An empty public token was submitted for exchange.
    ///
    /// Public tokens are opaque but never empty, so this is rejected before
    /// any network call is made.
    #[error("the public token must not be empty")]
    EmptyPublicToken,

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

/// The JSON body used for all error responses.
#[derive(Debug, Serialize)]
pub(crate) struct ErrorBody {
    pub error: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Error::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            Error::NoLinkedAccounts => (StatusCode::CONFLICT, self.to_string()),
            Error::RefreshInFlight => (StatusCode::CONFLICT, self.to_string()),
            Error::EmptyPublicToken => (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()),
            Error::Provider(detail) => {
                // The detail may include upstream request context, keep it
                // server-side.
                tracing::error!("provider call failed: {}", detail);
                (
                    StatusCode::BAD_GATEWAY,
                    "the financial data provider could not be reached".to_owned(),
                )
            }
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "an unexpected error occurred, check the server logs for more details"
                        .to_owned(),
                )
            }
        };

        (
            status,
            Json(ErrorBody {
                error: message,
            }),
        )
            .into_response()
    }
}
