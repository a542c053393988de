// handlers/users.rs - /api/users/:id handlers

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::api::{ApiResponse, ApiResult};
use crate::database::models::User;
use crate::services::user_service::UpdateUserRequest;
use crate::state::AppState;
use crate::tenancy::RequestContext;

/// PUT /api/users/:id
pub async fn update(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateUserRequest>,
) -> ApiResult<User> {
    let user = state.services.users.update(&ctx, id, request).await?;
    Ok(ApiResponse::success(user).with_message("User updated successfully"))
}

/// DELETE /api/users/:id
pub async fn delete(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    state.services.users.delete(&ctx, id).await?;
    Ok(ApiResponse::done("User deleted successfully"))
}
