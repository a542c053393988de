// handlers/audit.rs - GET /api/audit-logs

use axum::extract::{Query, State};
use serde::Deserialize;

use crate::api::{ApiResponse, ApiResult};
use crate::database::models::AuditEntry;
use crate::state::AppState;
use crate::tenancy::RequestContext;

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<i64>,
}

/// GET /api/audit-logs?limit=N - Newest entries of the caller's tenant
pub async fn list(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(query): Query<AuditQuery>,
) -> ApiResult<Vec<AuditEntry>> {
    Ok(ApiResponse::success(state.services.audit_log.list(&ctx, query.limit).await?))
}
