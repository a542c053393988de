// handlers/projects.rs - /api/projects/* handlers

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::api::{ApiResponse, ApiResult};
use crate::database::models::{ProjectWithStats, Task};
use crate::services::project_service::{CreateProjectRequest, UpdateProjectRequest};
use crate::services::task_service::CreateTaskRequest;
use crate::state::AppState;
use crate::tenancy::RequestContext;

/// GET /api/projects
pub async fn list(State(state): State<AppState>, ctx: RequestContext) -> ApiResult<Vec<ProjectWithStats>> {
    Ok(ApiResponse::success(state.services.projects.list(&ctx).await?))
}

/// POST /api/projects - Subject to the project quota
pub async fn create(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(request): Json<CreateProjectRequest>,
) -> ApiResult<ProjectWithStats> {
    let project = state.services.projects.create(&ctx, request).await?;
    Ok(ApiResponse::created(project).with_message("Project created successfully"))
}

/// GET /api/projects/:id
pub async fn get(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> ApiResult<ProjectWithStats> {
    Ok(ApiResponse::success(state.services.projects.get(&ctx, id).await?))
}

/// PUT /api/projects/:id
pub async fn update(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateProjectRequest>,
) -> ApiResult<ProjectWithStats> {
    let project = state.services.projects.update(&ctx, id, request).await?;
    Ok(ApiResponse::success(project).with_message("Project updated successfully"))
}

/// DELETE /api/projects/:id - Removes the project's tasks too
pub async fn delete(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    state.services.projects.delete(&ctx, id).await?;
    Ok(ApiResponse::done("Project deleted successfully"))
}

/// GET /api/projects/:id/tasks
pub async fn list_tasks(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<Task>> {
    Ok(ApiResponse::success(state.services.tasks.list_for_project(&ctx, id).await?))
}

/// POST /api/projects/:id/tasks
pub async fn create_task(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(request): Json<CreateTaskRequest>,
) -> ApiResult<Task> {
    let task = state.services.tasks.create(&ctx, id, request).await?;
    Ok(ApiResponse::created(task).with_message("Task created successfully"))
}
