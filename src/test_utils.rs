//! Test helpers: a scripted financial data provider and app state builders.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use rusqlite::Connection;
use time::Date;

use crate::{
    Error,
    db::initialize,
    provider::{FinancialProvider, ProviderAccount, ProviderTransaction, TokenExchange},
    state::AppState,
};

/// A [FinancialProvider] with scripted responses that records every call it
/// receives.
pub(crate) struct FakeProvider {
    accounts: Vec<ProviderAccount>,
    transactions: HashMap<String, Result<Vec<ProviderTransaction>, String>>,
    calls: Mutex<Vec<String>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            accounts: Vec::new(),
            transactions: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Script the accounts returned for any access token.
    pub fn with_accounts(mut self, accounts: Vec<ProviderAccount>) -> Self {
        self.accounts = accounts;
        self
    }

    /// Script the transactions returned for `access_token`.
    pub fn with_transactions(
        mut self,
        access_token: &str,
        transactions: Vec<ProviderTransaction>,
    ) -> Self {
        self.transactions
            .insert(access_token.to_owned(), Ok(transactions));
        self
    }

    /// Script a provider failure for `access_token`'s transaction sync.
    pub fn with_failing_sync(mut self, access_token: &str, message: &str) -> Self {
        self.transactions
            .insert(access_token.to_owned(), Err(message.to_owned()));
        self
    }

    /// Every provider call made so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl FinancialProvider for FakeProvider {
    async fn create_link_token(&self, user_id: &str) -> Result<String, Error> {
        self.record(format!("link_token_create {user_id}"));
        Ok(format!("link-sandbox-{user_id}"))
    }

    async fn exchange_public_token(&self, public_token: &str) -> Result<TokenExchange, Error> {
        self.record(format!("public_token_exchange {public_token}"));
        Ok(TokenExchange {
            access_token: format!("access-{public_token}"),
            item_id: format!("item-{public_token}"),
        })
    }

    async fn get_accounts(&self, access_token: &str) -> Result<Vec<ProviderAccount>, Error> {
        self.record(format!("accounts_get {access_token}"));
        Ok(self.accounts.clone())
    }

    async fn get_transactions(
        &self,
        access_token: &str,
        start_date: Date,
        end_date: Date,
    ) -> Result<Vec<ProviderTransaction>, Error> {
        self.record(format!(
            "transactions_get {access_token} {start_date} {end_date}"
        ));

        match self.transactions.get(access_token) {
            Some(Ok(transactions)) => Ok(transactions.clone()),
            Some(Err(message)) => Err(Error::Provider(message.clone())),
            None => Ok(Vec::new()),
        }
    }
}

/// Create an [AppState] over an in-memory database and the given provider.
///
/// The provider is returned alongside the state so tests can inspect its
/// recorded calls.
pub(crate) fn test_state(provider: FakeProvider) -> (AppState, Arc<FakeProvider>) {
    let connection = Connection::open_in_memory().expect("Could not open database in memory");
    initialize(&connection).expect("Could not initialize database");

    let provider = Arc::new(provider);
    let state = AppState::new(Arc::new(Mutex::new(connection)), provider.clone());

    (state, provider)
}

/// A checking account as the provider would report it.
pub(crate) fn checking_account(account_id: &str, name: &str) -> ProviderAccount {
    ProviderAccount {
        account_id: account_id.to_owned(),
        name: name.to_owned(),
        mask: Some("1234".to_owned()),
        kind: "depository".to_owned(),
        subtype: Some("checking".to_owned()),
    }
}

/// A settled transaction as the provider would report it.
pub(crate) fn provider_transaction(
    transaction_id: &str,
    amount: f64,
    date: Date,
) -> ProviderTransaction {
    ProviderTransaction {
        transaction_id: transaction_id.to_owned(),
        account_id: "acc-1".to_owned(),
        amount,
        category: None,
        date,
        description: format!("transaction {transaction_id}"),
        pending: false,
    }
}
