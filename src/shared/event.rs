//! WebSocket Envelopes
//!
//! Every frame exchanged over the chat socket is a JSON object carrying an
//! `action` discriminator.
//!
//! # Client → Server
//!
//! ```json
//! {"action":"send_message","content":"hi","recipientID":2}
//! {"action":"fetch_chat_history","user":2,"page":1}
//! ```
//!
//! # Server → Client
//!
//! ```json
//! {"action":"chat_history","content":[{"id":1,"sender":1,"receiver":2,"text":"hi","timestamp":"..."}]}
//! {"action":"newUser","data":3}
//! {"action":"disconnectUser","data":3}
//! ```
//!
//! Direct messages are not wrapped in an envelope; see
//! [`DirectMessage`](crate::shared::message::DirectMessage).

use serde::{Deserialize, Serialize};

use crate::shared::error::SharedError;
use crate::shared::message::{ChatMessage, UserId};

/// A decoded client envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientAction {
    /// Deliver `content` to every live session of `recipient_id` and persist it.
    SendMessage {
        content: String,
        #[serde(rename = "recipientID")]
        recipient_id: UserId,
    },

    /// Page through the conversation with `user`, newest first. Pages are 1-indexed.
    FetchChatHistory { user: UserId, page: i64 },
}

impl ClientAction {
    /// Decode a text frame. Unknown actions and missing fields are errors.
    pub fn parse(frame: &str) -> Result<Self, SharedError> {
        Ok(serde_json::from_str(frame)?)
    }

    /// Reject envelopes that decoded but carry unusable values.
    pub fn validate(&self, max_message_len: usize) -> Result<(), SharedError> {
        match self {
            Self::SendMessage { content, .. } => {
                if content.trim().is_empty() {
                    return Err(SharedError::validation("content", "message text cannot be empty"));
                }
                if content.len() > max_message_len {
                    return Err(SharedError::validation(
                        "content",
                        format!("message text exceeds {} bytes", max_message_len),
                    ));
                }
                Ok(())
            }
            Self::FetchChatHistory { page, .. } => {
                if *page < 1 {
                    return Err(SharedError::validation("page", "pages start at 1"));
                }
                Ok(())
            }
        }
    }
}

/// Server-originated envelopes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum ServerEvent {
    /// One page of history, newest first. Empty past the end.
    #[serde(rename = "chat_history")]
    ChatHistory { content: Vec<ChatMessage> },

    /// A session for `data` was admitted.
    #[serde(rename = "newUser")]
    NewUser { data: UserId },

    /// A session for `data` terminated.
    #[serde(rename = "disconnectUser")]
    DisconnectUser { data: UserId },
}

impl ServerEvent {
    /// Encode for the wire.
    pub fn to_json(&self) -> Result<String, SharedError> {
        Ok(serde_json::to_string(self)?)
    }
}
