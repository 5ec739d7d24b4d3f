/**
 * Application State
 *
 * Everything a request handler or connection task needs, cloned cheaply into
 * each of them. The hub handle and dispatcher are channel and `Arc` wrappers,
 * so a clone shares the same registry and store.
 */

use std::sync::Arc;

use axum::extract::FromRef;

use crate::backend::auth::SessionStore;
use crate::backend::chat::Dispatcher;
use crate::backend::realtime::hub::HubHandle;
use crate::shared::AppConfig;

#[derive(Clone)]
pub struct AppState {
    /// Handle to the connection registry task
    pub hub: HubHandle,

    /// Routes decoded client actions to the hub and the chat store
    pub dispatcher: Dispatcher,

    /// Resolves session cookies during the upgrade handshake
    pub sessions: Arc<dyn SessionStore>,

    pub config: Arc<AppConfig>,
}

impl FromRef<AppState> for HubHandle {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.hub.clone()
    }
}

impl FromRef<AppState> for Arc<AppConfig> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.config.clone()
    }
}
