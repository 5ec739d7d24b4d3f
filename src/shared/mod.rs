//! Shared Module
//!
//! Types that travel over the WebSocket or are needed on both sides of the
//! messaging core: envelopes, chat message records, configuration and the
//! shared error type.
//!
//! None of these types depend on the server stack, so they compile without
//! the `ssr` feature.

/// Chat message records and live-delivery payloads
pub mod message;

/// Client/server envelopes
pub mod event;

/// Shared error types
pub mod error;

/// Application configuration
pub mod config;

/// Re-export commonly used types for convenience
pub use config::{AppConfig, AppConfigBuilder, ConfigError};
pub use error::SharedError;
pub use event::{ClientAction, ServerEvent};
pub use message::{ChatMessage, DirectMessage, UserId};
