//! The API endpoint URIs.

/// The route for creating a link token to start the linking flow.
pub const LINK_TOKEN: &str = "/api/link/token";
/// The route for exchanging a public token for an access credential.
pub const LINK_EXCHANGE: &str = "/api/link/exchange";
/// The route for syncing the bank accounts of a linked item.
pub const SYNC_ACCOUNTS: &str = "/api/sync/accounts";
/// The route for reading the sync engine's loading/error status.
pub const SYNC_STATUS: &str = "/api/sync/status";
/// The route for reading transactions and their budget aggregates, and for
/// recording manually entered transactions.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route for the orchestrated transaction refresh.
pub const TRANSACTIONS_REFRESH: &str = "/api/transactions/refresh";
