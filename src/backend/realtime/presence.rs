/**
 * Presence Notifier
 *
 * Broadcasts `newUser` when a session is admitted and `disconnectUser` when
 * one terminates. Events go through the hub's broadcast path, so every live
 * connection (including the one that triggered the event) receives them.
 *
 * There is no snapshot for late joiners: a client's view of who is online is
 * built only from the events it observes after it connects.
 */

use crate::backend::realtime::hub::HubHandle;
use crate::shared::{ServerEvent, UserId};

/// Announce that `user_id` opened a session.
pub async fn announce_connected(hub: &HubHandle, user_id: UserId) {
    announce(hub, ServerEvent::NewUser { data: user_id }).await;
}

/// Announce that one of `user_id`'s sessions closed.
pub async fn announce_disconnected(hub: &HubHandle, user_id: UserId) {
    announce(hub, ServerEvent::DisconnectUser { data: user_id }).await;
}

async fn announce(hub: &HubHandle, event: ServerEvent) {
    let payload = match event.to_json() {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!(error = %e, "[Presence] Failed to encode event");
            return;
        }
    };

    if let Err(e) = hub.broadcast(payload).await {
        tracing::warn!(error = %e, ?event, "[Presence] Event not broadcast");
    }
}
