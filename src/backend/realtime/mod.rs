//! Real-time Module
//!
//! Everything that lives for the duration of a WebSocket session.
//!
//! # Module Structure
//!
//! ```text
//! realtime/
//! ├── mod.rs        - Module exports and documentation
//! ├── hub.rs        - Connection registry task and its handle
//! ├── connection.rs - Per-connection read/write pumps
//! ├── presence.rs   - newUser / disconnectUser events
//! └── handler.rs    - Authenticated upgrade endpoint
//! ```
//!
//! # Tasks
//!
//! One hub task for the whole process, plus two tasks per connection (read
//! and write). They talk over bounded channels only.
//!
//! # Ordering
//!
//! Frames from one connection are dispatched in order, and the hub pushes to
//! a given queue in the order it receives commands, so a recipient sees one
//! sender's messages in send order. No order is promised across senders, and
//! broadcast iteration order over the live set is unspecified.

/// Connection registry
pub mod hub;

/// Per-connection pumps
pub mod connection;

/// Presence events
pub mod presence;

/// WebSocket upgrade handler
pub mod handler;

pub use handler::ws_upgrade;
pub use hub::{ConnectionHandle, ConnectionId, Hub, HubHandle, HubStats};
