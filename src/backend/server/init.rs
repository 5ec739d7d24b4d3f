/**
 * Server Initialization
 *
 * Builds `AppState` from a validated `AppConfig` and hands it to the router.
 * The hub task is spawned here and lives as long as any clone of the state.
 */

use std::sync::Arc;

use axum::Router;
use sqlx::SqlitePool;

use crate::backend::auth::SqlSessionStore;
use crate::backend::chat::{Dispatcher, SqlChatStore};
use crate::backend::error::BackendError;
use crate::backend::realtime::hub::Hub;
use crate::backend::routes::create_router;
use crate::backend::server::config::load_database;
use crate::backend::server::state::AppState;
use crate::shared::AppConfig;

/// Assemble the state around an already migrated pool.
///
/// Must be called inside a Tokio runtime.
pub fn build_state(config: AppConfig, pool: SqlitePool) -> AppState {
    let hub = Hub::spawn(config.hub_queue_capacity);
    let store = Arc::new(SqlChatStore::new(pool.clone()));
    let dispatcher = Dispatcher::new(hub.clone(), store, config.max_message_len);

    AppState {
        hub,
        dispatcher,
        sessions: Arc::new(SqlSessionStore::new(pool)),
        config: Arc::new(config),
    }
}

/// Create and configure the Axum application.
///
/// # Errors
///
/// Fails if the database cannot be opened or migrated.
pub async fn create_app(config: AppConfig) -> Result<Router<()>, BackendError> {
    tracing::info!(
        outbound_queue_capacity = config.outbound_queue_capacity,
        hub_queue_capacity = config.hub_queue_capacity,
        idle_timeout = ?config.idle_timeout,
        ping_interval = ?config.ping_interval,
        "Initializing social hub backend"
    );

    let pool = load_database(&config.database_url).await?;
    let app = create_router(build_state(config, pool));

    tracing::info!("Router configured");
    Ok(app)
}
