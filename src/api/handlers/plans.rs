//! Plan listing API handlers
//!
//! Registration takes a plan by name, so authenticated clients need a way
//! to discover the available plans.

use crate::api::handlers::AppState;
use crate::api::response::ApiResponse;
use crate::core::error::{BugtrackError, Result};
use crate::db::models::Plan;
use crate::db::repository::Repository;
use axum::{
    extract::{Path, State},
    Json,
};

/// Handler for GET /api/plans - list all subscription plans
pub async fn list_plans(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<Plan>>>> {
    let plans = state.plan_repo.find_all().await?;

    Ok(Json(ApiResponse::with_data(
        "Plans retrieved successfully",
        plans,
    )))
}

/// Handler for GET /api/plans/:id - fetch a single plan
pub async fn get_plan(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Plan>>> {
    let plan = state
        .plan_repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| BugtrackError::NotFound("Plan not found".to_string()))?;

    Ok(Json(ApiResponse::with_data(
        "Plan retrieved successfully",
        plan,
    )))
}
