//! A Plaid HTTP client implementing [FinancialProvider].
//!
//! Every Plaid operation is a JSON POST carrying the client id and secret in
//! the request body. Non-2xx responses carry a structured error body whose
//! code and message are folded into the returned error detail.

use std::{str::FromStr, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use time::Date;

use crate::Error;

use super::{FinancialProvider, ProviderAccount, ProviderTransaction, TokenExchange};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The name shown to the user in the provider's linking flow.
const CLIENT_NAME: &str = "Spending Plan";

/// The Plaid environment a [PlaidClient] talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaidEnvironment {
    /// The test environment with simulated institutions.
    Sandbox,
    /// The environment for development with live institutions.
    Development,
    /// The live production environment.
    Production,
}

impl PlaidEnvironment {
    /// The base URL for API calls against this environment.
    pub fn base_url(&self) -> &'static str {
        match self {
            PlaidEnvironment::Sandbox => "https://sandbox.plaid.com",
            PlaidEnvironment::Development => "https://development.plaid.com",
            PlaidEnvironment::Production => "https://production.plaid.com",
        }
    }
}

impl FromStr for PlaidEnvironment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sandbox" => Ok(PlaidEnvironment::Sandbox),
            "development" => Ok(PlaidEnvironment::Development),
            "production" => Ok(PlaidEnvironment::Production),
            other => Err(format!(
                "unknown Plaid environment \"{other}\", expected one of sandbox, development, production"
            )),
        }
    }
}

/// A [FinancialProvider] backed by the Plaid REST API.
#[derive(Debug, Clone)]
pub struct PlaidClient {
    client: Client,
    base_url: String,
    client_id: String,
    secret: String,
}

impl PlaidClient {
    /// Create a client for `environment` authenticated with the given API
    /// credentials.
    pub fn new(environment: PlaidEnvironment, client_id: &str, secret: &str) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: environment.base_url().to_owned(),
            client_id: client_id.to_owned(),
            secret: secret.to_owned(),
        }
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|error| Error::Provider(format!("request to {path} failed: {error}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = match response.json::<PlaidErrorBody>().await {
                Ok(plaid_error) => format!(
                    "{path} returned {status}: {} ({})",
                    plaid_error.error_message, plaid_error.error_code
                ),
                Err(_) => format!("{path} returned {status}"),
            };
            return Err(Error::Provider(detail));
        }

        response
            .json()
            .await
            .map_err(|error| Error::Provider(format!("could not decode {path} response: {error}")))
    }
}

#[async_trait]
impl FinancialProvider for PlaidClient {
    async fn create_link_token(&self, user_id: &str) -> Result<String, Error> {
        let response: LinkTokenCreateResponse = self
            .post(
                "/link/token/create",
                &LinkTokenCreateRequest {
                    client_id: &self.client_id,
                    secret: &self.secret,
                    client_name: CLIENT_NAME,
                    language: "en",
                    country_codes: &["US"],
                    products: &["transactions"],
                    user: LinkTokenUser {
                        client_user_id: user_id,
                    },
                },
            )
            .await?;

        Ok(response.link_token)
    }

    async fn exchange_public_token(&self, public_token: &str) -> Result<TokenExchange, Error> {
        self.post(
            "/item/public_token/exchange",
            &PublicTokenExchangeRequest {
                client_id: &self.client_id,
                secret: &self.secret,
                public_token,
            },
        )
        .await
    }

    async fn get_accounts(&self, access_token: &str) -> Result<Vec<ProviderAccount>, Error> {
        let response: AccountsGetResponse = self
            .post(
                "/accounts/get",
                &AccountsGetRequest {
                    client_id: &self.client_id,
                    secret: &self.secret,
                    access_token,
                },
            )
            .await?;

        Ok(response
            .accounts
            .into_iter()
            .map(PlaidAccount::into_provider_account)
            .collect())
    }

    async fn get_transactions(
        &self,
        access_token: &str,
        start_date: Date,
        end_date: Date,
    ) -> Result<Vec<ProviderTransaction>, Error> {
        let response: TransactionsGetResponse = self
            .post(
                "/transactions/get",
                &TransactionsGetRequest {
                    client_id: &self.client_id,
                    secret: &self.secret,
                    access_token,
                    start_date,
                    end_date,
                    options: TransactionsGetOptions {
                        include_personal_finance_category: true,
                    },
                },
            )
            .await?;

        Ok(response
            .transactions
            .into_iter()
            .map(PlaidTransaction::into_provider_transaction)
            .collect())
    }
}

// ============================================================================
// WIRE TYPES
// ============================================================================

#[derive(Debug, Deserialize)]
struct PlaidErrorBody {
    error_code: String,
    error_message: String,
}

#[derive(Debug, Serialize)]
struct LinkTokenCreateRequest<'a> {
    client_id: &'a str,
    secret: &'a str,
    client_name: &'a str,
    language: &'a str,
    country_codes: &'a [&'a str],
    products: &'a [&'a str],
    user: LinkTokenUser<'a>,
}

#[derive(Debug, Serialize)]
struct LinkTokenUser<'a> {
    client_user_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct LinkTokenCreateResponse {
    link_token: String,
}

#[derive(Debug, Serialize)]
struct PublicTokenExchangeRequest<'a> {
    client_id: &'a str,
    secret: &'a str,
    public_token: &'a str,
}

#[derive(Debug, Serialize)]
struct AccountsGetRequest<'a> {
    client_id: &'a str,
    secret: &'a str,
    access_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct AccountsGetResponse {
    accounts: Vec<PlaidAccount>,
}

#[derive(Debug, Deserialize)]
struct PlaidAccount {
    account_id: String,
    name: String,
    mask: Option<String>,
    #[serde(rename = "type")]
    kind: String,
    subtype: Option<String>,
}

impl PlaidAccount {
    fn into_provider_account(self) -> ProviderAccount {
        ProviderAccount {
            account_id: self.account_id,
            name: self.name,
            mask: self.mask,
            kind: self.kind,
            subtype: self.subtype,
        }
    }
}

#[derive(Debug, Serialize)]
struct TransactionsGetRequest<'a> {
    client_id: &'a str,
    secret: &'a str,
    access_token: &'a str,
    start_date: Date,
    end_date: Date,
    options: TransactionsGetOptions,
}

#[derive(Debug, Serialize)]
struct TransactionsGetOptions {
    include_personal_finance_category: bool,
}

#[derive(Debug, Deserialize)]
struct TransactionsGetResponse {
    transactions: Vec<PlaidTransaction>,
}

#[derive(Debug, Deserialize)]
struct PlaidTransaction {
    transaction_id: String,
    account_id: String,
    amount: f64,
    personal_finance_category: Option<PersonalFinanceCategory>,
    date: Date,
    name: String,
    pending: bool,
}

#[derive(Debug, Deserialize)]
struct PersonalFinanceCategory {
    primary: Option<String>,
}

impl PlaidTransaction {
    fn into_provider_transaction(self) -> ProviderTransaction {
        ProviderTransaction {
            transaction_id: self.transaction_id,
            account_id: self.account_id,
            amount: self.amount,
            category: self
                .personal_finance_category
                .and_then(|category| category.primary),
            date: self.date,
            description: self.name,
            pending: self.pending,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================


#[cfg(test)]
mod wire_tests {
    use time::macros::date;

    use super::{PlaidTransaction, TransactionsGetResponse};

    #[test]
    fn deserializes_transactions_response() {
        let body = r#"{
            "transactions": [
                {
                    "transaction_id": "txn-1",
                    "account_id": "acc-1",
                    "amount": 12.5,
                    "personal_finance_category": { "primary": "FOOD_AND_DRINK" },
                    "date": "2024-01-15",
                    "name": "Coffee shop",
                    "pending": false
                }
            ],
            "total_transactions": 1,
            "request_id": "req-1"
        }"#;

        let response: TransactionsGetResponse =
            serde_json::from_str(body).expect("Could not deserialize response");
        let transaction = response
            .transactions
            .into_iter()
            .next()
            .expect("Expected one transaction")
            .into_provider_transaction();

        assert_eq!(transaction.transaction_id, "txn-1");
        assert_eq!(transaction.category, Some("FOOD_AND_DRINK".to_owned()));
        assert_eq!(transaction.date, date!(2024 - 01 - 15));
        assert_eq!(transaction.description, "Coffee shop");
    }

    #[test]
    fn missing_category_enrichment_maps_to_none() {
        let body = r#"{
            "transaction_id": "txn-2",
            "account_id": "acc-1",
            "amount": -250.0,
            "date": "2024-01-16",
            "name": "Salary",
            "pending": false
        }"#;

        let transaction: PlaidTransaction =
            serde_json::from_str(body).expect("Could not deserialize transaction");

        assert_eq!(transaction.into_provider_transaction().category, None);
    }
}
