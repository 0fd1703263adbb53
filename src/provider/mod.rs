//! The seam between the sync engine and the external financial data provider.
//!
//! The engine only ever talks to the provider through [FinancialProvider], so
//! tests can script responses and the concrete wire client stays swappable.

use async_trait::async_trait;
use serde::Deserialize;
use time::Date;

use crate::Error;

mod plaid;

pub use plaid::{PlaidClient, PlaidEnvironment};

/// The remote operations the sync engine needs from the financial data
/// provider.
///
/// Every method is a fallible remote call; failures surface as
/// [Error::Provider] with the underlying detail preserved for logging.
#[async_trait]
pub trait FinancialProvider: Send + Sync {
    /// Create a short-lived link token scoped to `user_id` for the client-side
    /// linking flow.
    async fn create_link_token(&self, user_id: &str) -> Result<String, Error>;

    /// Exchange a single-use public token for a durable access credential.
    ///
    /// Replaying a public token is expected to fail at the provider, tokens
    /// are single-use.
    async fn exchange_public_token(&self, public_token: &str) -> Result<TokenExchange, Error>;

    /// Fetch the bank accounts visible under `access_token`.
    async fn get_accounts(&self, access_token: &str) -> Result<Vec<ProviderAccount>, Error>;

    /// Fetch the transactions for `access_token` dated within the inclusive
    /// range `[start_date, end_date]`, with category enrichment requested.
    async fn get_transactions(
        &self,
        access_token: &str,
        start_date: Date,
        end_date: Date,
    ) -> Result<Vec<ProviderTransaction>, Error>;
}

/// The result of exchanging a public token: a long-lived access token and the
/// id of the institution connection ("item") it is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenExchange {
    /// The long-lived secret authorizing API calls against the linked item.
    pub access_token: String,
    /// The provider's identifier for the linked institution connection.
    pub item_id: String,
}

/// A bank account as reported by the provider, normalized to the fields the
/// engine persists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderAccount {
    /// The provider's identifier for the account.
    pub account_id: String,
    /// The account's display name.
    pub name: String,
    /// The last few digits of the account number, if the provider reports
    /// them.
    pub mask: Option<String>,
    /// The account's type classification, e.g. "depository".
    pub kind: String,
    /// The account's subtype classification, e.g. "checking".
    pub subtype: Option<String>,
}

/// A transaction as reported by the provider, normalized to the fields the
/// engine persists.
///
/// The amount follows the provider's sign convention: positive amounts are
/// outflows (expenses), negative amounts are inflows (income).
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderTransaction {
    /// The provider's identifier for the transaction. This is the conflict
    /// key that makes re-syncing a date window idempotent.
    pub transaction_id: String,
    /// The provider's identifier for the owning account.
    pub account_id: String,
    /// The signed amount of money that changed hands.
    pub amount: f64,
    /// The primary enriched category. Enrichment is best-effort and may be
    /// absent.
    pub category: Option<String>,
    /// The date the transaction occurred.
    pub date: Date,
    /// A human-readable description of the transaction.
    pub description: String,
    /// Whether the transaction is still pending settlement.
    pub pending: bool,
}
