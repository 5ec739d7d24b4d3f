//! Route Configuration Module
//!
//! The HTTP surface is small: one upgrade endpoint and one health probe.
//! See `router` for the table.

/// Main router creation
pub mod router;

pub use router::create_router;
