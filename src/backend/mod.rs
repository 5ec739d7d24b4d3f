//! Backend Module
//!
//! Server-side code for the messaging core: an Axum HTTP server exposing one
//! authenticated WebSocket endpoint, the connection hub behind it, and the
//! SQLite-backed chat store.
//!
//! This module is only compiled when the `ssr` feature is enabled.
//!
//! # Module Structure
//!
//! ```text
//! backend/
//! ├── mod.rs          - Module exports and documentation
//! ├── server/         - AppState, database loading, app creation
//! ├── routes/         - Router assembly
//! ├── realtime/       - Hub, connection pumps, presence, WS upgrade
//! ├── chat/           - Message dispatcher and chat store
//! ├── auth/           - Session token resolution
//! ├── middleware/     - Authenticated-user extractor
//! └── error/          - Error types
//! ```
//!
//! # Control Flow
//!
//! 1. `GET /ws` resolves the `session_token` cookie to a user id, then upgrades.
//! 2. The admitted connection registers with the hub and a `newUser` event is broadcast.
//! 3. Each inbound frame is decoded and handed to the dispatcher.
//! 4. `send_message` fans out through the hub and is written to the chat store.
//! 5. `fetch_chat_history` reads a page from the store and replies on the same socket.
//! 6. On close, `disconnectUser` is broadcast and the connection unregisters.
//!
//! # Thread Safety
//!
//! - The live-connection registry is owned by one hub task; others send it commands
//! - The chat store is a `sqlx` pool and tolerates concurrent callers
//! - Each socket has exactly one reader task and one writer task

/// Server setup and configuration
pub mod server;

/// Route configuration
pub mod routes;

/// Hub, connections, presence
pub mod realtime;

/// Chat dispatching and persistence
pub mod chat;

/// Backend error types
pub mod error;

/// Session resolution
pub mod auth;

/// Request extractors
pub mod middleware;

pub use chat::db::{ChatStore, SqlChatStore};
pub use error::BackendError;
pub use realtime::hub::{Hub, HubHandle};
pub use server::{create_app, AppState};
