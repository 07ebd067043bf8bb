//! Authentication API handlers

use crate::api::handlers::AppState;
use crate::api::response::ApiResponse;
use crate::auth::middleware::AuthUser;
use crate::auth::models::{
    AccessTokenPayload, AuthPayload, LoginRequest, RefreshRequest, RegisterRequest, UserInfo,
};
use crate::core::error::{BugtrackError, Result};
use crate::db::repository::Repository;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

/// Handler for POST /api/auth/register - create an identity, issue tokens
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse> {
    tracing::info!(email = %req.email, "Registration attempt");

    let payload = state.auth_service.register(req).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_data(
            "User registered successfully",
            payload,
        )),
    ))
}

/// Handler for POST /api/auth/login - authenticate, issue tokens
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<AuthPayload>>> {
    tracing::info!(email = %req.email, "Login attempt");

    let payload = state.auth_service.login(req).await?;

    Ok(Json(ApiResponse::with_data("Login successful", payload)))
}

/// Handler for POST /api/auth/refresh - redeem a refresh token.
/// The posted refresh token is verified here; the new access token is
/// minted from the identity's current stored role.
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<ApiResponse<AccessTokenPayload>>> {
    req.validate()?;

    let claims = state
        .token_service
        .verify_refresh_token(&req.refresh_token)
        .map_err(|_| BugtrackError::Unauthorized)?;

    let payload = state.auth_service.refresh_access_token(&claims.sub).await?;

    Ok(Json(ApiResponse::with_data(
        "Token refreshed successfully",
        payload,
    )))
}

/// Handler for POST /api/auth/logout - stateless; audit log only
pub async fn logout(user: AuthUser) -> Json<ApiResponse<()>> {
    tracing::info!(user_id = %user.id, email = %user.email, "User logged out");

    Json(ApiResponse::message("Logout successful"))
}

/// Handler for GET /api/auth/me - current caller's identity
pub async fn me(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ApiResponse<UserInfo>>> {
    let db_user = state
        .user_repo
        .find_by_id(&user.id)
        .await?
        .ok_or_else(|| BugtrackError::NotFound("User not found".to_string()))?;

    Ok(Json(ApiResponse::with_data(
        "User retrieved successfully",
        UserInfo::from(db_user),
    )))
}
