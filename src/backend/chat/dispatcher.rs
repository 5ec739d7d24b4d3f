/**
 * Message Dispatcher
 *
 * Turns a decoded client envelope into work:
 *
 * - `send_message`: stamp the payload with the sender and server time, push
 *   it to every live connection of the recipient through the hub, then write
 *   it to the chat store whether or not anyone received it live.
 * - `fetch_chat_history`: read one page of the conversation from the chat
 *   store and push it back onto the requesting connection's own queue.
 *
 * A store failure after a live delivery is logged only; the live copy is not
 * recalled and the client is not told. Pages are computed with an offset, so
 * messages written between two page fetches can shift rows across pages.
 */

use std::sync::Arc;

use chrono::Utc;

use crate::backend::chat::db::ChatStore;
use crate::backend::error::BackendError;
use crate::backend::realtime::hub::{ConnectionId, HubHandle};
use crate::shared::{ChatMessage, ClientAction, DirectMessage, ServerEvent, UserId};

/// Messages per history page.
pub const HISTORY_PAGE_SIZE: i64 = 10;

/// The connection a frame arrived on.
#[derive(Debug, Clone, Copy)]
pub struct Origin {
    pub connection_id: ConnectionId,
    pub user_id: UserId,
}

#[derive(Clone)]
pub struct Dispatcher {
    hub: HubHandle,
    store: Arc<dyn ChatStore>,
    max_message_len: usize,
}

impl Dispatcher {
    pub fn new(hub: HubHandle, store: Arc<dyn ChatStore>, max_message_len: usize) -> Self {
        Self {
            hub,
            store,
            max_message_len,
        }
    }

    /// Decode, validate and act on one text frame.
    pub async fn dispatch_frame(&self, origin: Origin, frame: &str) -> Result<(), BackendError> {
        let action = ClientAction::parse(frame)?;
        action.validate(self.max_message_len)?;
        self.dispatch(origin, action).await
    }

    pub async fn dispatch(&self, origin: Origin, action: ClientAction) -> Result<(), BackendError> {
        match action {
            ClientAction::SendMessage {
                content,
                recipient_id,
            } => {
                self.send_message(origin.user_id, recipient_id, content).await?;
                Ok(())
            }
            ClientAction::FetchChatHistory { user, page } => {
                self.fetch_chat_history(origin, user, page).await
            }
        }
    }

    /// Deliver live to every session of `recipient_id` and persist.
    ///
    /// Returns the number of connections the message was pushed to.
    pub async fn send_message(
        &self,
        sender_id: UserId,
        recipient_id: UserId,
        content: String,
    ) -> Result<usize, BackendError> {
        let now = Utc::now();
        let payload = serde_json::to_string(&DirectMessage::stamp(
            content.clone(),
            recipient_id,
            sender_id,
            now,
        ))?;

        let delivered = match self.hub.send_to_user(recipient_id, payload).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(sender_id, recipient_id, error = %e, "[Chat] Live delivery skipped");
                0
            }
        };

        match self
            .store
            .store_message(sender_id, recipient_id, &content, now)
            .await
        {
            Ok(stored) => {
                tracing::debug!(
                    message_id = stored.id,
                    sender_id,
                    recipient_id,
                    delivered,
                    "[Chat] Message sent"
                );
            }
            Err(e) => {
                tracing::error!(
                    sender_id,
                    recipient_id,
                    delivered,
                    error = %e,
                    "[Chat] Failed to store message; live copy already delivered"
                );
            }
        }

        Ok(delivered)
    }

    /// One page of the conversation between `user_id` and `other`.
    ///
    /// A page past the end yields an empty list, not an error.
    pub async fn history_page(
        &self,
        user_id: UserId,
        other: UserId,
        page: i64,
    ) -> Result<Vec<ChatMessage>, BackendError> {
        if page < 1 {
            return Err(BackendError::protocol("pages start at 1"));
        }
        let offset = (page - 1).saturating_mul(HISTORY_PAGE_SIZE);

        let total = self.store.count_between(user_id, other).await?;
        if offset >= total {
            return Ok(Vec::new());
        }

        self.store
            .messages_between(user_id, other, HISTORY_PAGE_SIZE, offset)
            .await
    }

    /// Reply to `origin` with a `chat_history` envelope.
    pub async fn fetch_chat_history(
        &self,
        origin: Origin,
        other: UserId,
        page: i64,
    ) -> Result<(), BackendError> {
        let content = self.history_page(origin.user_id, other, page).await?;
        tracing::debug!(
            user_id = origin.user_id,
            other,
            page,
            returned = content.len(),
            "[Chat] History page"
        );

        let payload = ServerEvent::ChatHistory { content }.to_json()?;
        self.hub
            .send_to_connection(origin.connection_id, payload)
            .await
    }
}
