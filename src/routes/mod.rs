//! The JSON API surface over the sync engine.
//!
//! All routes expect the authenticated user's id in the `x-user-id` header,
//! injected by the upstream identity proxy.

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

pub mod endpoints;

mod link;
mod sync;
mod transactions;

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(endpoints::LINK_TOKEN, post(link::create_link_token_endpoint))
        .route(
            endpoints::LINK_EXCHANGE,
            post(link::exchange_public_token_endpoint),
        )
        .route(endpoints::SYNC_ACCOUNTS, post(sync::sync_accounts_endpoint))
        .route(endpoints::SYNC_STATUS, get(sync::get_sync_status_endpoint))
        .route(
            endpoints::TRANSACTIONS,
            get(transactions::get_transactions_endpoint)
                .post(transactions::create_transaction_endpoint),
        )
        .route(
            endpoints::TRANSACTIONS_REFRESH,
            post(transactions::refresh_transactions_endpoint),
        )
        .with_state(state)
}
