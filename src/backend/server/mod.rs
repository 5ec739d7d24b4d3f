//! Server Module
//!
//! Wiring for the HTTP server: shared state, the database pool, and the
//! function that assembles everything into a router.
//!
//! # Module Structure
//!
//! ```text
//! server/
//! ├── mod.rs          - Module exports and documentation
//! ├── state.rs        - AppState and FromRef implementations
//! ├── config.rs       - Database pool loading and migrations
//! └── init.rs         - State construction and app creation
//! ```
//!
//! # Initialization Flow
//!
//! 1. **Database**: open the SQLite pool and run migrations (fatal on failure)
//! 2. **Hub**: spawn the connection registry task
//! 3. **State**: build the dispatcher and session store around the pool
//! 4. **Router**: mount `/ws` and `/health`

/// Application state management
pub mod state;

/// Database pool loading
pub mod config;

/// Server initialization
pub mod init;

pub use init::{build_state, create_app};
pub use state::AppState;
