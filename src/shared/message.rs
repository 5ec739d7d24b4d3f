//! Chat message types
//!
//! `ChatMessage` is the persisted record returned by history queries.
//! `DirectMessage` is the payload pushed live to a recipient's connections.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of an authenticated user, as supplied by the session store.
pub type UserId = i64;

/// A persisted chat message between two users.
///
/// Serialized for clients as
/// `{"id", "sender", "receiver", "text", "timestamp"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Row identity
    pub id: i64,
    /// Sending user
    #[serde(rename = "sender")]
    pub sender_id: UserId,
    /// Receiving user
    #[serde(rename = "receiver")]
    pub receiver_id: UserId,
    /// Message body
    #[serde(rename = "text")]
    pub message: String,
    /// Creation time
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Whether this message was exchanged between `a` and `b`, in either direction.
    pub fn is_between(&self, a: UserId, b: UserId) -> bool {
        (self.sender_id == a && self.receiver_id == b)
            || (self.sender_id == b && self.receiver_id == a)
    }
}

/// A message as delivered live to the recipient's open connections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectMessage {
    pub content: String,
    #[serde(rename = "recipientID")]
    pub recipient_id: UserId,
    pub sender: UserId,
    /// RFC3339, second precision
    pub timestamp: String,
}

impl DirectMessage {
    /// Stamp an outgoing message with its sender and the server time.
    pub fn stamp(content: String, recipient_id: UserId, sender: UserId, at: DateTime<Utc>) -> Self {
        Self {
            content,
            recipient_id,
            sender,
            timestamp: at.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}
