//! Role listing API handlers

use crate::api::handlers::AppState;
use crate::api::response::ApiResponse;
use crate::core::error::{BugtrackError, Result};
use crate::db::models::Role;
use crate::db::repository::Repository;
use axum::{
    extract::{Path, State},
    Json,
};

/// Handler for GET /api/roles - list all roles
pub async fn list_roles(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<Role>>>> {
    let roles = state.role_repo.find_all().await?;

    Ok(Json(ApiResponse::with_data(
        "Roles retrieved successfully",
        roles,
    )))
}

/// Handler for GET /api/roles/:id - fetch a single role
pub async fn get_role(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Role>>> {
    let role = state
        .role_repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| BugtrackError::NotFound("Role not found".to_string()))?;

    Ok(Json(ApiResponse::with_data(
        "Role retrieved successfully",
        role,
    )))
}
