//! Implements a struct that holds the state of the JSON API server.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::{provider::FinancialProvider, sync::SyncStatus};

/// The state of the JSON API server.
///
/// Sync status and the single-flight refresh guard live here, on an explicit
/// handle with the server's lifecycle, rather than as process-global state.
#[derive(Clone)]
pub struct AppState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The client for the external financial data provider.
    pub provider: Arc<dyn FinancialProvider>,
    /// The observable loading/error state of the last refresh.
    pub sync_status: Arc<Mutex<SyncStatus>>,
    /// Rejects a refresh while another refresh is still in flight.
    pub refresh_guard: Arc<tokio::sync::Mutex<()>>,
}

impl AppState {
    /// Create a new [AppState].
    pub fn new(
        db_connection: Arc<Mutex<Connection>>,
        provider: Arc<dyn FinancialProvider>,
    ) -> Self {
        Self {
            db_connection,
            provider,
            sync_status: Arc::new(Mutex::new(SyncStatus::default())),
            refresh_guard: Arc::new(tokio::sync::Mutex::new(())),
        }
    }
}
