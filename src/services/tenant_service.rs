use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::audit::{AuditAction, AuditRecorder};
use crate::authz::{ensure_same_tenant, permissions, AuthzError};
use crate::database::models::{Tenant, TenantBranding, TenantUpdate};
use crate::database::Stores;
use crate::quota::PlanLimits;
use crate::tenancy::{RequestContext, TenantId};
use crate::types::{Plan, TenantStatus};

use super::{required, ServiceError, ServiceResult};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTenantRequest {
    pub name: Option<String>,
    pub status: Option<TenantStatus>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePlanRequest {
    pub plan: Plan,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantStats {
    pub total_users: i64,
    pub total_projects: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TenantDetails {
    pub tenant: Tenant,
    pub stats: TenantStats,
}

pub struct TenantService {
    stores: Stores,
    audit: Arc<AuditRecorder>,
}

impl TenantService {
    pub fn new(stores: Stores, audit: Arc<AuditRecorder>) -> Self {
        Self { stores, audit }
    }

    async fn load(&self, id: &TenantId) -> ServiceResult<Tenant> {
        self.stores
            .tenants
            .find_tenant(id)
            .await?
            .ok_or_else(|| ServiceError::TenantNotFound(id.to_string()))
    }

    /// Super admins may address any tenant; everyone else only the bound one.
    fn ensure_addressable(ctx: &RequestContext, id: &TenantId) -> Result<(), AuthzError> {
        if ctx.is_super_admin() {
            return Ok(());
        }
        ensure_same_tenant(id, ctx.tenant_id().as_ref())
    }

    pub async fn list(&self, ctx: &RequestContext) -> ServiceResult<Vec<Tenant>> {
        ctx.authorize(&permissions::LIST_TENANTS)?;
        Ok(self.stores.tenants.list_tenants().await?)
    }

    pub async fn get(&self, ctx: &RequestContext, id: &TenantId) -> ServiceResult<TenantDetails> {
        ctx.authorize(&permissions::VIEW_TENANT)?;
        Self::ensure_addressable(ctx, id)?;

        let tenant = self.load(id).await?;
        let (total_users, total_projects) = futures::try_join!(
            self.stores.users.count_users(id),
            self.stores.projects.count_projects(id),
        )?;

        Ok(TenantDetails {
            tenant,
            stats: TenantStats {
                total_users,
                total_projects,
            },
        })
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: &TenantId,
        request: UpdateTenantRequest,
    ) -> ServiceResult<Tenant> {
        let principal = ctx.authorize(&permissions::UPDATE_TENANT)?;
        Self::ensure_addressable(ctx, id)?;

        if !principal.is_super_admin() && request.status.is_some() {
            return Err(AuthzError::Denied("Admins can only update the organization name").into());
        }

        let update = TenantUpdate {
            name: request.name.as_deref().map(|n| required("name", n)).transpose()?,
            status: request.status,
        };

        self.load(id).await?;
        self.audit
            .record(
                ctx,
                AuditAction::UpdateTenant,
                format!("Tenant ID {} updated by role: {}", id, principal.role),
            )
            .await;

        self.stores
            .tenants
            .update_tenant(id, &update)
            .await?
            .ok_or_else(|| ServiceError::TenantNotFound(id.to_string()))
    }

    /// Moves the tenant to `plan` and resets its ceilings to that plan's defaults.
    pub async fn change_plan(&self, ctx: &RequestContext, id: &TenantId, plan: Plan) -> ServiceResult<Tenant> {
        ctx.authorize(&permissions::CHANGE_PLAN)?;

        let current = self.load(id).await?;
        self.audit
            .record(
                ctx,
                AuditAction::ChangePlan,
                format!(
                    "Tenant ID {} plan changed from {} to {}",
                    id, current.subscription_plan, plan
                ),
            )
            .await;

        self.stores
            .tenants
            .change_plan(id, plan, PlanLimits::for_plan(plan))
            .await?
            .ok_or_else(|| ServiceError::TenantNotFound(id.to_string()))
    }

    /// Public branding for whichever tenant the request host resolved to.
    pub async fn branding(&self, ctx: &RequestContext) -> ServiceResult<TenantBranding> {
        let id = ctx.tenant_id().ok_or(ServiceError::NotFound("Tenant"))?;
        let tenant = self.load(&id).await?;
        Ok(TenantBranding::from(&tenant))
    }
}
