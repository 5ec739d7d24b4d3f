//! Authentication Module
//!
//! The chat core does not log users in; it only needs a verified user id
//! before admitting a connection. `SessionStore` is that boundary.

/// Session token resolution
pub mod sessions;

pub use sessions::{SessionStore, SqlSessionStore};
