/**
 * Authenticated User Extractor
 *
 * Reads the `session_token` cookie and resolves it through the configured
 * `SessionStore`. Handlers that take `AuthUser` never run for anonymous or
 * expired sessions; the request is answered with 401 instead.
 */

use axum::{
    extract::FromRequestParts,
    http::{header::COOKIE, request::Parts, HeaderMap},
};
use cookie::Cookie;

use crate::backend::error::BackendError;
use crate::backend::server::state::AppState;
use crate::shared::UserId;

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE: &str = "session_token";

/// The verified user behind a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuthUser(pub UserId);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = BackendError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers).ok_or_else(|| {
            tracing::warn!("[Auth] Missing session cookie");
            BackendError::unauthorized("missing session cookie")
        })?;

        match state.sessions.user_for_token(&token).await? {
            Some(user_id) => Ok(AuthUser(user_id)),
            None => {
                tracing::warn!("[Auth] Rejected session token");
                Err(BackendError::unauthorized("invalid or expired session"))
            }
        }
    }
}

/// Find a non-empty `session_token` in the request's `Cookie` headers.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == SESSION_COOKIE && !cookie.value().is_empty())
        .map(|cookie| cookie.value().to_string())
}
