pub mod plans;
pub mod roles;
pub mod users;

pub use plans::*;
pub use roles::*;
pub use users::*;

use crate::auth::service::AuthService;
use crate::auth::token::TokenService;
use crate::db::repository::{PlanRepository, RoleRepository, UserRepository};
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;

/// Shared application state for handlers
#[derive(Clone)]
pub struct AppState {
    pub user_repo: Arc<UserRepository>,
    pub role_repo: Arc<RoleRepository>,
    pub plan_repo: Arc<PlanRepository>,
    pub token_service: Arc<TokenService>,
    pub auth_service: Arc<AuthService>,
}

/// Health check endpoint handler
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().timestamp(),
    }))
}
