//! Common test utilities and helpers
//!
//! - `database` - throwaway SQLite files and session fixtures
//! - `server` - a real server on an ephemeral port plus a WebSocket client

#![allow(dead_code)]

pub mod database;
pub mod server;

pub use database::*;
pub use server::*;
