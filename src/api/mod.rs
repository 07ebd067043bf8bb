//! HTTP API surface
//!
//! Router construction, handlers, response envelopes, and the server.

pub mod handlers;
pub mod response;
pub mod routes;
pub mod server;

pub use response::{ApiResponse, Page, PageInfo};
pub use server::ApiServer;
