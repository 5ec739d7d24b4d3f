//! Social Hub - Real-time Messaging Core
//!
//! Social Hub is the real-time messaging subsystem of a social-network
//! backend. It tracks live WebSocket sessions, fans out direct and presence
//! messages, and persists/paginates chat history.
//!
//! # Module Structure
//!
//! - **`shared`** - Wire types and configuration
//!   - Client/server envelopes, chat message records
//!   - Application configuration
//!   - Error types
//!
//! - **`backend`** - Server-side code (only compiled with `ssr` feature)
//!   - Axum HTTP server and the authenticated WebSocket endpoint
//!   - Connection hub, per-connection pumps, presence events
//!   - Message dispatching and SQLite persistence
//!
//! # Feature Flags
//!
//! - **`ssr`** (default) - enables the `backend` module and the server binary
//!
//! # Usage
//!
//! ```rust,no_run
//! use social_hub::backend::server::init::create_app;
//! use social_hub::shared::AppConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::from_env()?;
//! let app = create_app(config).await?;
//! // Serve `app` with axum::serve
//! # Ok(())
//! # }
//! ```
//!
//! # Concurrency
//!
//! The set of live connections is owned by a single hub task. Every other
//! task reaches it by sending a command over a channel; there is no lock
//! around the registry.

/// Shared types and data structures
pub mod shared;

/// Backend server-side code
#[cfg(feature = "ssr")]
pub mod backend;
