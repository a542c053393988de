// handlers/auth.rs - /api/auth/* handlers

use axum::{extract::State, Json};

use crate::api::{ApiResponse, ApiResult};
use crate::services::auth_service::{LoginRequest, LoginResponse, Profile, RegisterRequest, Registration};
use crate::state::AppState;
use crate::tenancy::RequestContext;

/// POST /api/auth/register - Create a tenant and its first admin
pub async fn register(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<Registration> {
    let registration = state.services.auth.register(&ctx, request).await?;
    Ok(ApiResponse::created(registration).with_message("Tenant registered successfully"))
}

/// POST /api/auth/login - Exchange credentials for a bearer token
pub async fn login(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(request): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let response = state.services.auth.login(&ctx, request).await?;
    Ok(ApiResponse::success(response).with_message("Login successful"))
}

/// GET /api/auth/me - Current user with their tenant
pub async fn me(State(state): State<AppState>, ctx: RequestContext) -> ApiResult<Profile> {
    Ok(ApiResponse::success(state.services.auth.me(&ctx).await?))
}

/// POST /api/auth/logout - Tokens are stateless; this only leaves an audit entry
pub async fn logout(State(state): State<AppState>, ctx: RequestContext) -> ApiResult<()> {
    state.services.auth.logout(&ctx).await?;
    Ok(ApiResponse::done("Logged out successfully"))
}
