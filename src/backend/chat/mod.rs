//! Chat Module
//!
//! Handles the two chat actions a connection can send and the storage behind
//! them.
//!
//! # Module Structure
//!
//! ```text
//! chat/
//! ├── mod.rs        - Module exports
//! ├── dispatcher.rs - send_message / fetch_chat_history
//! └── db.rs         - ChatStore trait and SQLite implementation
//! ```

/// Chat persistence
pub mod db;

/// Envelope dispatching
pub mod dispatcher;

pub use db::{ChatStore, SqlChatStore};
pub use dispatcher::{Dispatcher, Origin, HISTORY_PAGE_SIZE};
