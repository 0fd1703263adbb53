//! Route handlers for the account linking flow.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    identity::AuthenticatedUser,
    state::AppState,
    sync::{create_link_token, link_item},
};

/// The response body for a newly created link token.
#[derive(Debug, Serialize, Deserialize)]
pub struct LinkTokenBody {
    /// The short-lived token the client-side linking flow consumes.
    pub link_token: String,
}

/// The request body for exchanging a public token.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExchangeBody {
    /// The single-use public token produced by the linking flow.
    pub public_token: String,
}

/// A route handler for creating a link token scoped to the authenticated
/// user.
pub async fn create_link_token_endpoint(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<LinkTokenBody>, Error> {
    let link_token = create_link_token(&state, &user).await?;

    Ok(Json(LinkTokenBody {
        link_token,
    }))
}

/// A route handler for exchanging a public token for a stored access
/// credential.
///
/// The credential itself is never returned; clients only learn that the link
/// succeeded.
pub async fn exchange_public_token_endpoint(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(body): Json<ExchangeBody>,
) -> Result<StatusCode, Error> {
    link_item(&state, &user, &body.public_token).await?;

    Ok(StatusCode::CREATED)
}
