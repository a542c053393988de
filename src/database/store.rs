// database/store.rs - Persistence collaborator interfaces
//
// Every query over tenant-owned rows takes the tenant as an explicit
// argument and filters on it. The few unscoped lookups (`find_user`,
// `find_project`, `find_task`, `list_all_*`) exist for ownership checks that
// compare the stored tenant against the bound one, and for super-admin
// global listings.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{AuditEntry, Project, Task, TaskCounts, Tenant, TenantUpdate, User};
use crate::quota::PlanLimits;
use crate::tenancy::TenantId;
use crate::types::Plan;

#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn insert_tenant(&self, tenant: Tenant) -> Result<Tenant, DatabaseError>;

    /// Writes the tenant and its first admin together, or neither.
    async fn register_tenant(&self, tenant: Tenant, admin: User) -> Result<(Tenant, User), DatabaseError>;

    async fn find_tenant(&self, id: &TenantId) -> Result<Option<Tenant>, DatabaseError>;

    async fn find_by_subdomain(&self, subdomain: &str) -> Result<Option<Tenant>, DatabaseError>;

    async fn subdomain_exists(&self, subdomain: &str) -> Result<bool, DatabaseError>;

    async fn list_tenants(&self) -> Result<Vec<Tenant>, DatabaseError>;

    async fn update_tenant(&self, id: &TenantId, update: &TenantUpdate) -> Result<Option<Tenant>, DatabaseError>;

    /// Sets the plan and its ceilings in one atomic write.
    async fn change_plan(&self, id: &TenantId, plan: Plan, limits: PlanLimits) -> Result<Option<Tenant>, DatabaseError>;

    async fn ping(&self) -> Result<(), DatabaseError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(&self, user: User) -> Result<User, DatabaseError>;

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError>;

    /// `tenant = None` looks among platform users (super admins).
    async fn find_user_by_email(&self, tenant: Option<&TenantId>, email: &str) -> Result<Option<User>, DatabaseError>;

    async fn list_users(&self, tenant: &TenantId) -> Result<Vec<User>, DatabaseError>;

    async fn count_users(&self, tenant: &TenantId) -> Result<i64, DatabaseError>;

    async fn update_user(&self, tenant: &TenantId, user: &User) -> Result<Option<User>, DatabaseError>;

    async fn delete_user(&self, tenant: &TenantId, id: Uuid) -> Result<bool, DatabaseError>;
}

#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn insert_project(&self, project: Project) -> Result<Project, DatabaseError>;

    async fn find_project(&self, id: Uuid) -> Result<Option<Project>, DatabaseError>;

    async fn find_project_in_tenant(&self, tenant: &TenantId, id: Uuid) -> Result<Option<Project>, DatabaseError>;

    async fn list_projects(&self, tenant: &TenantId) -> Result<Vec<Project>, DatabaseError>;

    async fn list_all_projects(&self) -> Result<Vec<Project>, DatabaseError>;

    async fn count_projects(&self, tenant: &TenantId) -> Result<i64, DatabaseError>;

    async fn update_project(&self, tenant: &TenantId, project: &Project) -> Result<Option<Project>, DatabaseError>;

    async fn delete_project(&self, tenant: &TenantId, id: Uuid) -> Result<bool, DatabaseError>;
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn insert_task(&self, task: Task) -> Result<Task, DatabaseError>;

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, DatabaseError>;

    async fn list_project_tasks(&self, tenant: &TenantId, project_id: Uuid) -> Result<Vec<Task>, DatabaseError>;

    async fn list_tasks(&self, tenant: &TenantId) -> Result<Vec<Task>, DatabaseError>;

    async fn list_all_tasks(&self) -> Result<Vec<Task>, DatabaseError>;

    async fn task_counts(&self, tenant: &TenantId, project_id: Uuid) -> Result<TaskCounts, DatabaseError>;

    async fn update_task(&self, tenant: &TenantId, task: &Task) -> Result<Option<Task>, DatabaseError>;

    async fn delete_task(&self, tenant: &TenantId, id: Uuid) -> Result<bool, DatabaseError>;
}

/// Append-only: there is deliberately no update or delete.
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append_audit(&self, entry: AuditEntry) -> Result<(), DatabaseError>;

    /// Newest first.
    async fn list_audit(&self, tenant: &TenantId, limit: i64) -> Result<Vec<AuditEntry>, DatabaseError>;
}

/// The full set of collaborators the services run against.
#[derive(Clone)]
pub struct Stores {
    pub tenants: Arc<dyn TenantStore>,
    pub users: Arc<dyn UserStore>,
    pub projects: Arc<dyn ProjectStore>,
    pub tasks: Arc<dyn TaskStore>,
    pub audit: Arc<dyn AuditStore>,
}

impl Stores {
    pub fn in_memory() -> Self {
        let store = Arc::new(super::memory::MemoryStore::new());
        Self::from_backend(store)
    }

    pub fn postgres(pool: sqlx::PgPool) -> Self {
        let store = Arc::new(super::postgres::PgStore::new(pool));
        Self::from_backend(store)
    }

    fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: TenantStore + UserStore + ProjectStore + TaskStore + AuditStore + 'static,
    {
        Self {
            tenants: backend.clone(),
            users: backend.clone(),
            projects: backend.clone(),
            tasks: backend.clone(),
            audit: backend,
        }
    }
}
