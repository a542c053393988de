use std::sync::Arc;

use crate::authz::permissions;
use crate::database::models::AuditEntry;
use crate::database::store::AuditStore;
use crate::tenancy::RequestContext;

use super::ServiceResult;

pub const DEFAULT_AUDIT_PAGE: i64 = 100;
const MAX_AUDIT_PAGE: i64 = 500;

/// Read side of the audit trail.
pub struct AuditLogService {
    store: Arc<dyn AuditStore>,
}

impl AuditLogService {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    /// Newest entries for the bound tenant.
    pub async fn list(&self, ctx: &RequestContext, limit: Option<i64>) -> ServiceResult<Vec<AuditEntry>> {
        ctx.authorize(&permissions::VIEW_AUDIT_LOG)?;
        let bound = ctx.require_tenant()?;
        let limit = limit.unwrap_or(DEFAULT_AUDIT_PAGE).clamp(1, MAX_AUDIT_PAGE);
        Ok(self.store.list_audit(&bound, limit).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditAction;
    use crate::authz::AuthzError;
    use crate::services::project_service::CreateProjectRequest;
    use crate::services::ServiceError;
    use crate::testing::TestContext;
    use crate::types::{Plan, Role};

    #[tokio::test]
    async fn test_mutations_show_up_for_the_tenant_admin_only() {
        let t = TestContext::new();
        let acme = t.create_tenant("acme", Plan::Free).await;
        let globex = t.create_tenant("globex", Plan::Free).await;
        let admin = t.request_as(Some(&acme), "admin@acme.com", Role::TenantAdmin);

        t.services
            .projects
            .create(
                &admin,
                CreateProjectRequest {
                    name: "Audited".to_string(),
                    description: None,
                    status: None,
                },
            )
            .await
            .unwrap();

        let entries = t.services.audit_log.list(&admin, None).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, AuditAction::CreateProject);
        assert_eq!(entries[0].actor.as_deref(), Some("admin@acme.com"));

        let other = t.request_as(Some(&globex), "admin@globex.com", Role::TenantAdmin);
        assert!(t.services.audit_log.list(&other, None).await.unwrap().is_empty());

        let user = t.request_as(Some(&acme), "user@acme.com", Role::TenantUser);
        let err = t.services.audit_log.list(&user, None).await.unwrap_err();
        assert!(matches!(err, ServiceError::Authz(AuthzError::RoleNotAllowed { .. })));
    }
}
