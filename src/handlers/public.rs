// handlers/public.rs - GET /api/public/tenant

use axum::extract::State;

use crate::api::{ApiResponse, ApiResult};
use crate::database::models::TenantBranding;
use crate::state::AppState;
use crate::tenancy::RequestContext;

/// GET /api/public/tenant - Branding for the tenant named by the request host
pub async fn tenant(State(state): State<AppState>, ctx: RequestContext) -> ApiResult<TenantBranding> {
    Ok(ApiResponse::success(state.services.tenants.branding(&ctx).await?))
}
