//! User management API handlers

use crate::api::handlers::AppState;
use crate::api::response::{ApiResponse, Page, PageInfo};
use crate::auth::middleware::AuthUser;
use crate::auth::models::{ChangePasswordRequest, UpdateRoleRequest, UserInfo};
use crate::auth::password::{hash_password, verify_password};
use crate::core::error::{BugtrackError, Result};
use crate::db::repository::Repository;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use tokio::task;

const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 100;

/// Pagination query parameters for user listing
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// Handler for GET /api/users - paginated user listing (admin only)
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<ApiResponse<Page<UserInfo>>>> {
    let page = params.page.unwrap_or(1).max(1);
    let page_size = params
        .page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    // Widen before multiplying: an extreme client-supplied page must not
    // overflow, it just lands past the end and yields an empty page
    let offset = (page as u64 - 1) * page_size as u64;

    let users = state.user_repo.find_page(page_size, offset).await?;
    let total = state.user_repo.count().await?;

    let body = Page {
        items: users.into_iter().map(UserInfo::from).collect(),
        pagination: PageInfo::new(page, page_size, total),
    };

    Ok(Json(ApiResponse::with_data(
        "Users retrieved successfully",
        body,
    )))
}

/// Handler for GET /api/users/:id - fetch a single user
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<UserInfo>>> {
    let user = state
        .user_repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| BugtrackError::NotFound("User not found".to_string()))?;

    Ok(Json(ApiResponse::with_data(
        "User retrieved successfully",
        UserInfo::from(user),
    )))
}

/// Handler for PUT /api/users/:id/password - change own password.
/// The current password must verify; only the account owner may change it.
pub async fn change_password(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<()>>> {
    req.validate()?;

    if caller.id != id {
        return Err(BugtrackError::Forbidden);
    }

    let user = state
        .user_repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| BugtrackError::NotFound("User not found".to_string()))?;

    let current = req.current_password;
    let hash = user.password_hash.clone();
    let valid = task::spawn_blocking(move || verify_password(&current, &hash))
        .await
        .map_err(|e| BugtrackError::Internal(format!("Hashing task panicked: {}", e)))?;
    if !valid {
        tracing::warn!(user_id = %id, "Password change with wrong current password");
        return Err(BugtrackError::InvalidCredentials);
    }

    let new_password = req.new_password;
    let new_hash = task::spawn_blocking(move || hash_password(&new_password))
        .await
        .map_err(|e| BugtrackError::Internal(format!("Hashing task panicked: {}", e)))??;

    state.user_repo.update_password(&id, &new_hash).await?;

    tracing::info!(user_id = %id, "Password changed");

    Ok(Json(ApiResponse::message("Password changed successfully")))
}

/// Handler for PATCH /api/users/:id/role - assign a role (admin only).
/// Takes effect on the target's next token refresh.
pub async fn update_role(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateRoleRequest>,
) -> Result<Json<ApiResponse<UserInfo>>> {
    req.validate()?;

    let role = state
        .role_repo
        .find_by_name(&req.role)
        .await?
        .ok_or_else(|| BugtrackError::NotFound("Role not found".to_string()))?;

    state.user_repo.update_role(&id, &role.id).await?;

    let user = state
        .user_repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| BugtrackError::NotFound("User not found".to_string()))?;

    tracing::info!(
        user_id = %id,
        role = %role.name,
        changed_by = %caller.id,
        "Role assigned"
    );

    Ok(Json(ApiResponse::with_data(
        "Role updated successfully",
        UserInfo::from(user),
    )))
}
