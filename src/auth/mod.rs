//! Authentication and authorization
//!
//! Credential hashing, JWT issuance/verification, request middleware,
//! and the register/login/refresh workflows.

pub mod handlers;
pub mod middleware;
pub mod models;
pub mod password;
pub mod service;
pub mod token;

pub use middleware::{authenticate, authorize, AuthUser, Role, ADMIN_ONLY, ADMIN_OR_DEVELOPER};
pub use service::AuthService;
pub use token::{TokenError, TokenService};
