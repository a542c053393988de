// handlers/tenants.rs - /api/tenants/* handlers

use axum::{
    extract::{Path, State},
    Json,
};

use crate::api::{ApiResponse, ApiResult};
use crate::database::models::{Tenant, User};
use crate::services::tenant_service::{ChangePlanRequest, TenantDetails, UpdateTenantRequest};
use crate::services::user_service::CreateUserRequest;
use crate::state::AppState;
use crate::tenancy::{RequestContext, TenantId};

/// GET /api/tenants - All tenants (super admin)
pub async fn list(State(state): State<AppState>, ctx: RequestContext) -> ApiResult<Vec<Tenant>> {
    Ok(ApiResponse::success(state.services.tenants.list(&ctx).await?))
}

/// GET /api/tenants/:id - Tenant with user and project totals
pub async fn get(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<TenantId>,
) -> ApiResult<TenantDetails> {
    Ok(ApiResponse::success(state.services.tenants.get(&ctx, &id).await?))
}

/// PUT /api/tenants/:id - Rename (tenant admin) or rename/suspend (super admin)
pub async fn update(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<TenantId>,
    Json(request): Json<UpdateTenantRequest>,
) -> ApiResult<Tenant> {
    let tenant = state.services.tenants.update(&ctx, &id, request).await?;
    Ok(ApiResponse::success(tenant).with_message("Tenant updated"))
}

/// PUT /api/tenants/:id/plan - Change subscription plan (super admin)
pub async fn change_plan(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<TenantId>,
    Json(request): Json<ChangePlanRequest>,
) -> ApiResult<Tenant> {
    let tenant = state.services.tenants.change_plan(&ctx, &id, request.plan).await?;
    Ok(ApiResponse::success(tenant).with_message("Subscription plan updated"))
}

/// GET /api/tenants/:id/users - Members of the caller's own tenant
pub async fn list_users(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<TenantId>,
) -> ApiResult<Vec<User>> {
    Ok(ApiResponse::success(state.services.users.list(&ctx, &id).await?))
}

/// POST /api/tenants/:id/users - Add a member, subject to the user quota
pub async fn create_user(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<TenantId>,
    Json(request): Json<CreateUserRequest>,
) -> ApiResult<User> {
    let user = state.services.users.create(&ctx, &id, request).await?;
    Ok(ApiResponse::created(user).with_message("User added successfully"))
}
