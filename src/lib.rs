//! Bugtrackin Backend Library
//!
//! Authentication and authorization core for a bug-tracking REST backend:
//! credential hashing, JWT access/refresh tokens, role-gated routes, and
//! the user/role management surface around them.

pub mod api;
pub mod auth;
pub mod core;
pub mod db;

// Re-export commonly used types
pub use api::ApiServer;
pub use crate::core::{BugtrackError, Config, Logger};
pub use db::DatabaseManager;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
