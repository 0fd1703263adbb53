//! User identity as established by the external identity service.
//!
//! Authentication itself is delegated to an identity proxy that sits in front
//! of this server and injects the authenticated user's stable identifier into
//! each request. This module only extracts and types that identifier;
//! credential rows created during link exchange are scoped to it.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};

use crate::ErrorBody;

/// The request header the identity proxy sets to the authenticated user's id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The stable identifier of a user, as issued by the external identity
/// service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserId(String);

impl UserId {
    /// Create a user id from the identifier issued by the identity service.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Extracts the authenticated user from the identity proxy's header.
///
/// Requests without the header (or with an empty value) are rejected with
/// `401 Unauthorized` before the handler runs.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub UserId);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = MissingIdentity;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(|value| AuthenticatedUser(UserId::new(value)))
            .ok_or(MissingIdentity)
    }
}

/// Rejection for requests that did not come through the identity proxy.
#[derive(Debug)]
pub struct MissingIdentity;

impl IntoResponse for MissingIdentity {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorBody {
                error: "the request is missing the authenticated user header".to_owned(),
            }),
        )
            .into_response()
    }
}
