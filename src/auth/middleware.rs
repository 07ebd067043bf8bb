//! Authentication and authorization middleware
//!
//! `authenticate` verifies the bearer access token and attaches the caller's
//! identity to the request. `authorize` is a single generic gate evaluated
//! against an allow-list of roles; route tables pick the named constants.

use crate::auth::token::decode_unverified;
use crate::auth::TokenError;
use crate::core::error::{BugtrackError, Result};
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Authenticated caller identity, attached to request extensions.
/// Built from verified access-token claims; no storage lookup per request.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

/// The fixed set of roles the authorization gates recognize. Custom role
/// names may exist in storage; they simply never match an allow-list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Admin,
    Developer,
    Tester,
    Viewer,
}

impl Role {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "admin" => Some(Role::Admin),
            "developer" => Some(Role::Developer),
            "tester" => Some(Role::Tester),
            "viewer" => Some(Role::Viewer),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Developer => "developer",
            Role::Tester => "tester",
            Role::Viewer => "viewer",
        }
    }
}

/// Allow-list for administrator-only routes
pub const ADMIN_ONLY: &[Role] = &[Role::Admin];

/// Allow-list for routes open to administrators and developers
pub const ADMIN_OR_DEVELOPER: &[Role] = &[Role::Admin, Role::Developer];

/// Evaluate an allow-list against the authenticated caller.
/// Missing identity is Unauthorized; a known identity outside the list
/// (including unknown role names) is Forbidden.
pub fn check_access(user: Option<&AuthUser>, allowed: &[Role]) -> Result<()> {
    let user = user.ok_or(BugtrackError::Unauthorized)?;
    match Role::from_name(&user.role) {
        Some(role) if allowed.contains(&role) => Ok(()),
        _ => Err(BugtrackError::Forbidden),
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Authentication middleware for protected routes
pub async fn authenticate(
    State(state): State<crate::api::handlers::AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    // Absent or malformed header is rejected before any token work
    let token = match bearer_token(request.headers()) {
        Some(t) => t.to_string(),
        None => {
            tracing::warn!(%method, %path, "Missing bearer token");
            return BugtrackError::Unauthorized.into_response();
        }
    };

    let claims = match state.token_service.verify_access_token(&token) {
        Ok(c) => c,
        Err(TokenError::Expired) => {
            // Who presented it matters for the audit trail; nothing is granted
            let sub = decode_unverified(&token)
                .map(|c| c.sub)
                .unwrap_or_default();
            tracing::warn!(%method, %path, %sub, "Expired access token");
            return BugtrackError::Unauthorized.into_response();
        }
        Err(_) => {
            tracing::warn!(%method, %path, "Invalid access token");
            return BugtrackError::Unauthorized.into_response();
        }
    };

    request.extensions_mut().insert(AuthUser {
        id: claims.sub,
        email: claims.email,
        role: claims.role,
    });

    next.run(request).await
}

/// Authorization middleware: one gate, parameterized by allow-list.
/// Layered inside `authenticate`, so the identity is normally present;
/// a missing one still fails closed.
pub async fn authorize(allowed: &'static [Role], request: Request, next: Next) -> Response {
    let user = request.extensions().get::<AuthUser>();

    if let Err(e) = check_access(user, allowed) {
        let method = request.method();
        let path = request.uri().path();
        let role = user.map(|u| u.role.as_str()).unwrap_or("<none>");
        tracing::warn!(%method, %path, %role, "Access denied");
        return e.into_response();
    }

    next.run(request).await
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = BugtrackError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(BugtrackError::Unauthorized)
    }
}
