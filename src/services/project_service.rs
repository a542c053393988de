use futures::future::try_join_all;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::audit::{AuditAction, AuditRecorder};
use crate::authz::permissions;
use crate::database::models::{Project, ProjectWithStats};
use crate::database::Stores;
use crate::quota::QuotaEnforcer;
use crate::tenancy::RequestContext;
use crate::types::ResourceKind;

use super::{required, ServiceError, ServiceResult};

const PROJECT_STATUSES: [&str; 3] = ["active", "archived", "completed"];

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

fn project_status(value: &str) -> ServiceResult<String> {
    let status = value.trim().to_ascii_lowercase();
    if PROJECT_STATUSES.contains(&status.as_str()) {
        Ok(status)
    } else {
        Err(ServiceError::invalid(
            "status",
            format!("must be one of {}", PROJECT_STATUSES.join(", ")),
        ))
    }
}

pub struct ProjectService {
    stores: Stores,
    quota: Arc<QuotaEnforcer>,
    audit: Arc<AuditRecorder>,
}

impl ProjectService {
    pub fn new(stores: Stores, quota: Arc<QuotaEnforcer>, audit: Arc<AuditRecorder>) -> Self {
        Self { stores, quota, audit }
    }

    async fn with_stats(&self, project: Project) -> ServiceResult<ProjectWithStats> {
        let counts = self
            .stores
            .tasks
            .task_counts(&project.tenant_id, project.id)
            .await?;
        Ok(ProjectWithStats {
            project,
            task_count: counts.total,
            completed_task_count: counts.completed,
        })
    }

    /// Bound tenant's projects; the global list for super admins.
    pub async fn list(&self, ctx: &RequestContext) -> ServiceResult<Vec<ProjectWithStats>> {
        ctx.authorize(&permissions::LIST_PROJECTS)?;
        let projects = if ctx.is_super_admin() {
            self.stores.projects.list_all_projects().await?
        } else {
            let bound = ctx.require_tenant()?;
            self.stores.projects.list_projects(&bound).await?
        };
        try_join_all(projects.into_iter().map(|p| self.with_stats(p))).await
    }

    pub async fn create(&self, ctx: &RequestContext, request: CreateProjectRequest) -> ServiceResult<ProjectWithStats> {
        let principal = ctx.authorize(&permissions::CREATE_PROJECT)?;
        let bound = ctx.require_tenant()?;

        let name = required("name", &request.name)?;
        let status = match request.status.as_deref() {
            Some(s) => project_status(s)?,
            None => "active".to_string(),
        };

        let tenant = self
            .stores
            .tenants
            .find_tenant(&bound)
            .await?
            .ok_or_else(|| ServiceError::TenantNotFound(bound.to_string()))?;

        let _permit = self.quota.acquire(&bound).await;
        let count = self.stores.projects.count_projects(&bound).await?;
        QuotaEnforcer::check(&tenant.quota(), ResourceKind::Project, count)?;

        let mut project = Project::new(bound, name, request.description, Some(principal.subject.clone()));
        project.status = status;

        self.audit
            .record(
                ctx,
                AuditAction::CreateProject,
                format!("Project created: {} by {}", project.name, principal.subject),
            )
            .await;

        let project = self.stores.projects.insert_project(project).await?;
        Ok(ProjectWithStats {
            project,
            task_count: 0,
            completed_task_count: 0,
        })
    }

    /// Another tenant's project is reported as missing, not forbidden.
    async fn load(&self, ctx: &RequestContext, id: Uuid) -> ServiceResult<Project> {
        let bound = ctx.require_tenant()?;
        self.stores
            .projects
            .find_project_in_tenant(&bound, id)
            .await?
            .ok_or(ServiceError::NotFound("Project"))
    }

    pub async fn get(&self, ctx: &RequestContext, id: Uuid) -> ServiceResult<ProjectWithStats> {
        ctx.authorize(&permissions::VIEW_PROJECT)?;
        let project = self.load(ctx, id).await?;
        self.with_stats(project).await
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        request: UpdateProjectRequest,
    ) -> ServiceResult<ProjectWithStats> {
        let principal = ctx.authorize(&permissions::UPDATE_PROJECT)?;
        let mut project = self.load(ctx, id).await?;

        if let Some(name) = &request.name {
            project.name = required("name", name)?;
        }
        if request.description.is_some() {
            project.description = request.description;
        }
        if let Some(status) = &request.status {
            project.status = project_status(status)?;
        }

        self.audit
            .record(
                ctx,
                AuditAction::UpdateProject,
                format!("Project ID {} updated by user {}", id, principal.subject),
            )
            .await;

        let updated = self
            .stores
            .projects
            .update_project(&project.tenant_id, &project)
            .await?
            .ok_or(ServiceError::NotFound("Project"))?;
        self.with_stats(updated).await
    }

    pub async fn delete(&self, ctx: &RequestContext, id: Uuid) -> ServiceResult<()> {
        let principal = ctx.authorize(&permissions::DELETE_PROJECT)?;
        let project = self.load(ctx, id).await?;

        self.audit
            .record(
                ctx,
                AuditAction::DeleteProject,
                format!("Project ID {} deleted by user {}", id, principal.subject),
            )
            .await;

        if !self.stores.projects.delete_project(&project.tenant_id, id).await? {
            return Err(ServiceError::NotFound("Project"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quota::QuotaError;
    use crate::testing::TestContext;
    use crate::types::{Plan, Role};

    fn named(name: &str) -> CreateProjectRequest {
        CreateProjectRequest {
            name: name.to_string(),
            description: None,
            status: None,
        }
    }

    #[tokio::test]
    async fn test_free_plan_allows_three_projects() {
        let t = TestContext::new();
        let acme = t.create_tenant("acme", Plan::Free).await;
        let ctx = t.request_as(Some(&acme), "admin@acme.com", Role::TenantAdmin);

        for name in ["One", "Two", "Three"] {
            t.services.projects.create(&ctx, named(name)).await.unwrap();
        }
        let err = t.services.projects.create(&ctx, named("Four")).await.unwrap_err();
        match err {
            ServiceError::Quota(QuotaError::Exceeded { plan, limit, .. }) => {
                assert_eq!(plan, Plan::Free);
                assert_eq!(limit, 3);
            }
            other => panic!("expected quota error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_concurrent_creates_respect_ceiling() {
        let t = Arc::new(TestContext::new());
        let acme = t.create_tenant("acme", Plan::Free).await;

        let attempts = (0..8).map(|i| {
            let t = t.clone();
            let acme = acme.clone();
            tokio::spawn(async move {
                let ctx = t.request_as(Some(&acme), "admin@acme.com", Role::TenantAdmin);
                t.services.projects.create(&ctx, named(&format!("P{i}"))).await.is_ok()
            })
        });
        let results = futures::future::join_all(attempts).await;
        let created = results.into_iter().filter(|r| matches!(r, Ok(true))).count();

        assert_eq!(created, 3);
        assert_eq!(t.stores.projects.count_projects(&acme.id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_other_tenants_project_is_not_found() {
        let t = TestContext::new();
        let acme = t.create_tenant("acme", Plan::Free).await;
        let globex = t.create_tenant("globex", Plan::Free).await;
        let acme_ctx = t.request_as(Some(&acme), "admin@acme.com", Role::TenantAdmin);
        let globex_ctx = t.request_as(Some(&globex), "admin@globex.com", Role::TenantAdmin);

        let project = t.services.projects.create(&acme_ctx, named("Secret")).await.unwrap();
        let id = project.project.id;

        assert!(matches!(
            t.services.projects.get(&globex_ctx, id).await,
            Err(ServiceError::NotFound("Project"))
        ));
        assert!(matches!(
            t.services.projects.delete(&globex_ctx, id).await,
            Err(ServiceError::NotFound("Project"))
        ));
        assert!(t.services.projects.list(&globex_ctx).await.unwrap().is_empty());
        assert_eq!(t.services.projects.list(&acme_ctx).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_super_admin_lists_everything() {
        let t = TestContext::new();
        for sub in ["acme", "globex"] {
            let tenant = t.create_tenant(sub, Plan::Free).await;
            let ctx = t.request_as(Some(&tenant), "admin@x.com", Role::TenantAdmin);
            t.services.projects.create(&ctx, named(sub)).await.unwrap();
        }

        let root = t.request_as(None, "superadmin@system.com", Role::SuperAdmin);
        assert_eq!(t.services.projects.list(&root).await.unwrap().len(), 2);

        // but cannot create: not in the allow-list
        assert!(t.services.projects.create(&root, named("x")).await.is_err());
    }

    #[tokio::test]
    async fn test_invalid_status_rejected() {
        let t = TestContext::new();
        let acme = t.create_tenant("acme", Plan::Free).await;
        let ctx = t.request_as(Some(&acme), "admin@acme.com", Role::TenantAdmin);

        let err = t
            .services
            .projects
            .create(
                &ctx,
                CreateProjectRequest {
                    name: "P".to_string(),
                    description: None,
                    status: Some("exploded".to_string()),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Invalid { field: "status", .. }));
    }
}
