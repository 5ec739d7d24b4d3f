/**
 * Router Configuration
 *
 * - `GET /ws` - authenticated WebSocket upgrade
 * - `GET /health` - liveness plus hub counters
 *
 * Anything else falls through to a plain 404.
 */

use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::backend::error::BackendError;
use crate::backend::realtime::handler::ws_upgrade;
use crate::backend::realtime::hub::HubHandle;
use crate::backend::server::state::AppState;

pub fn create_router(app_state: AppState) -> Router<()> {
    Router::new()
        .route("/ws", get(ws_upgrade))
        .route("/health", get(health))
        .fallback(|| async { (axum::http::StatusCode::NOT_FOUND, "404 Not Found") })
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(app_state)
}

async fn health(State(hub): State<HubHandle>) -> Result<Json<Value>, BackendError> {
    let stats = hub.stats().await?;
    Ok(Json(json!({
        "status": "ok",
        "connections": stats.connections,
        "users": stats.users,
    })))
}
