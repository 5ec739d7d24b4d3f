//! Middleware Module
//!
//! Request-level helpers that run before handlers.
//!
//! - **`auth`** - `AuthUser` extractor backed by the session store

pub mod auth;

pub use auth::{session_token, AuthUser, SESSION_COOKIE};
