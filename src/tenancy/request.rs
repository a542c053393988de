use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::auth::Principal;
use crate::authz::{self, AuthzError, Permission};
use crate::error::ApiError;
use crate::types::Role;

use super::context::{TenantContext, TenantId};

/// Everything a service needs to know about who is calling and for which
/// tenant. Built once per request by the resolution pipeline and passed
/// explicitly down the call chain.
#[derive(Debug, Clone)]
pub struct RequestContext {
    tenant: TenantContext,
    principal: Option<Principal>,
}

impl RequestContext {
    pub fn new(tenant: TenantContext, principal: Option<Principal>) -> Self {
        Self { tenant, principal }
    }

    pub fn tenant(&self) -> &TenantContext {
        &self.tenant
    }

    /// Tenant bound to this request right now.
    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant.current()
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn role(&self) -> Option<Role> {
        self.principal.as_ref().map(|p| p.role)
    }

    pub fn is_super_admin(&self) -> bool {
        self.role() == Some(Role::SuperAdmin)
    }

    /// Runs the authorization gate for `permission`.
    pub fn authorize(&self, permission: &Permission) -> Result<&Principal, AuthzError> {
        authz::authorize(self.principal(), permission)
    }

    /// The bound tenant, or `AuthzError::NoTenant` when nothing is bound.
    pub fn require_tenant(&self) -> Result<TenantId, AuthzError> {
        self.tenant_id().ok_or(AuthzError::NoTenant)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<RequestContext>().cloned().ok_or_else(|| {
            tracing::error!("RequestContext missing: tenant resolution middleware is not installed");
            ApiError::internal_server_error("Request context unavailable")
        })
    }
}
