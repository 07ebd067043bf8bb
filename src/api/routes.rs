//! API routes
//!
//! Three tiers: public, authenticated, and role-gated. The gates are the
//! single `authorize` middleware parameterized by an allow-list; the
//! authentication layer wraps everything below the public tier.

use crate::api::handlers::{
    change_password, get_plan, get_role, get_user, health_check, list_plans, list_roles,
    list_users, update_role, AppState,
};
use crate::auth::handlers::{login, logout, me, refresh, register};
use crate::auth::middleware::{authenticate, authorize, ADMIN_ONLY, ADMIN_OR_DEVELOPER};
use axum::{
    extract::Request,
    middleware::{self, Next},
    routing::{get, patch, post, put},
    Router,
};

/// Build the API routes
pub fn build_api_routes(state: AppState) -> Router {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/health", get(health_check));

    // Administrator-only routes
    let admin_routes = Router::new()
        .route("/api/users", get(list_users))
        .route("/api/users/:id/role", patch(update_role))
        .layer(middleware::from_fn(|req: Request, next: Next| {
            authorize(ADMIN_ONLY, req, next)
        }));

    // Routes open to administrators and developers
    let staff_routes = Router::new()
        .route("/api/roles", get(list_roles))
        .route("/api/roles/:id", get(get_role))
        .layer(middleware::from_fn(|req: Request, next: Next| {
            authorize(ADMIN_OR_DEVELOPER, req, next)
        }));

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        .route("/api/auth/refresh", post(refresh))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
        .route("/api/users/:id", get(get_user))
        .route("/api/users/:id/password", put(change_password))
        .route("/api/plans", get(list_plans))
        .route("/api/plans/:id", get(get_plan))
        .merge(admin_routes)
        .merge(staff_routes)
        .layer(middleware::from_fn_with_state(state.clone(), authenticate));

    public_routes.merge(protected_routes).with_state(state)
}
