/**
 * WebSocket Upgrade Endpoint
 *
 * `GET /ws` admits a chat connection. The caller must already hold a session:
 * the `AuthUser` extractor resolves the `session_token` cookie before the
 * upgrade is accepted, so a failed check costs no socket, queue or registry
 * entry.
 */

use axum::{
    extract::{State, WebSocketUpgrade},
    http::{header::ORIGIN, HeaderMap, StatusCode},
    response::Response,
};

use crate::backend::error::BackendError;
use crate::backend::middleware::AuthUser;
use crate::backend::realtime::connection::run_connection;
use crate::backend::server::state::AppState;
use crate::shared::AppConfig;

/// GET /ws
pub async fn ws_upgrade(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<Response, BackendError> {
    check_origin(&state.config, &headers)?;

    tracing::info!(user_id, "[Realtime] WebSocket connection authenticated");

    Ok(ws.on_upgrade(move |socket| run_connection(socket, user_id, state)))
}

/// With `allowed_origin` configured, the `Origin` header must match it exactly.
pub fn check_origin(config: &AppConfig, headers: &HeaderMap) -> Result<(), BackendError> {
    let Some(allowed) = config.allowed_origin.as_deref() else {
        return Ok(());
    };

    let origin = headers.get(ORIGIN).and_then(|value| value.to_str().ok());
    if origin == Some(allowed) {
        return Ok(());
    }

    tracing::warn!(?origin, allowed, "[Realtime] Upgrade refused, origin not allowed");
    Err(BackendError::handler(StatusCode::FORBIDDEN, "origin not allowed"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_any_origin_without_restriction() {
        let config = AppConfig::default();
        assert!(check_origin(&config, &HeaderMap::new()).is_ok());
    }

    #[test]
    fn test_origin_must_match_when_configured() {
        let config = AppConfig::builder()
            .allowed_origin("https://social.example")
            .build()
            .unwrap();

        let mut headers = HeaderMap::new();
        assert!(check_origin(&config, &headers).is_err());

        headers.insert(ORIGIN, HeaderValue::from_static("https://evil.example"));
        let err = check_origin(&config, &headers).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

        headers.insert(ORIGIN, HeaderValue::from_static("https://social.example"));
        assert!(check_origin(&config, &headers).is_ok());
    }
}
