// handlers/tasks.rs - /api/tasks/* handlers

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::api::{ApiResponse, ApiResult};
use crate::database::models::Task;
use crate::services::task_service::{StatusChange, UpdateTaskRequest};
use crate::state::AppState;
use crate::tenancy::RequestContext;

/// GET /api/tasks - Tenant tasks, or every task for super admins
pub async fn list(State(state): State<AppState>, ctx: RequestContext) -> ApiResult<Vec<Task>> {
    Ok(ApiResponse::success(state.services.tasks.list(&ctx).await?))
}

/// PUT /api/tasks/:id
pub async fn update(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateTaskRequest>,
) -> ApiResult<Task> {
    let task = state.services.tasks.update(&ctx, id, request).await?;
    Ok(ApiResponse::success(task).with_message("Task updated successfully"))
}

/// PATCH /api/tasks/:id/status
pub async fn update_status(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(change): Json<StatusChange>,
) -> ApiResult<Task> {
    let task = state.services.tasks.update_status(&ctx, id, change.status).await?;
    Ok(ApiResponse::success(task).with_message("Task status updated"))
}

/// DELETE /api/tasks/:id
pub async fn delete(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    state.services.tasks.delete(&ctx, id).await?;
    Ok(ApiResponse::done("Task deleted successfully"))
}
