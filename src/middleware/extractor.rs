use std::convert::Infallible;

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::request::Parts;

use super::error::AuthError;
use crate::types::{Attributes, SessionId};

/// CAS principal attached to the request by
/// [`require_cas_auth`](super::require_cas_auth).
///
/// Use as an Axum extractor in gated route handlers. Returns
/// `401 Unauthorized` if the gate did not run for the route.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected(user: CasUser) -> impl IntoResponse {
///     format!("Hello, {} (session {})", user.user, user.session_id)
/// }
///
/// // Optional: accessible to both authenticated and anonymous users
/// async fn public(user: Option<CasUser>) -> impl IntoResponse {
///     match user {
///         Some(u) => format!("Hello, {}", u.user),
///         None => "Hello, guest".to_string(),
///     }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CasUser {
    /// Session ID (from cookie).
    pub session_id: SessionId,
    /// CAS user name.
    pub user: String,
    /// Attributes captured when the session was created.
    pub attributes: Attributes,
}

impl<S: Send + Sync> FromRequestParts<S> for CasUser {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CasUser>()
            .cloned()
            .ok_or(AuthError::Unauthenticated)
    }
}

impl<S: Send + Sync> OptionalFromRequestParts<S> for CasUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<CasUser>().cloned())
    }
}
