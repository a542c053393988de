// database/memory.rs - In-process backend for tests and `serve --memory`
//
// Mirrors the PostgreSQL backend's filtering rules: every tenant-scoped
// query matches on `tenant_id`, and (tenant, email) is unique among users.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::manager::DatabaseError;
use super::models::{AuditEntry, Project, Task, TaskCounts, TaskStatus, Tenant, TenantUpdate, User};
use super::store::{AuditStore, ProjectStore, TaskStore, TenantStore, UserStore};
use crate::quota::PlanLimits;
use crate::tenancy::TenantId;
use crate::types::Plan;

#[derive(Default)]
struct Tables {
    tenants: HashMap<TenantId, Tenant>,
    users: HashMap<Uuid, User>,
    projects: HashMap<Uuid, Project>,
    tasks: HashMap<Uuid, Task>,
    audit: Vec<AuditEntry>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Tables {
    fn ensure_subdomain_free(&self, subdomain: &str) -> Result<(), DatabaseError> {
        if self
            .tenants
            .values()
            .any(|t| t.subdomain.eq_ignore_ascii_case(subdomain))
        {
            return Err(DatabaseError::Conflict(format!("subdomain '{}' already taken", subdomain)));
        }
        Ok(())
    }

    fn ensure_user_free(&self, user: &User) -> Result<(), DatabaseError> {
        if self.users.contains_key(&user.id) {
            return Err(DatabaseError::Conflict(format!("user {} already exists", user.id)));
        }
        if self
            .users
            .values()
            .any(|u| u.tenant_id == user.tenant_id && u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(DatabaseError::Conflict(format!(
                "email '{}' already registered",
                user.email
            )));
        }
        Ok(())
    }
}

fn newest_first<T, F>(mut rows: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> chrono::DateTime<Utc>,
{
    rows.sort_by(|a, b| key(b).cmp(&key(a)));
    rows
}

#[async_trait]
impl TenantStore for MemoryStore {
    async fn insert_tenant(&self, tenant: Tenant) -> Result<Tenant, DatabaseError> {
        let mut tables = self.tables.write().await;
        tables.ensure_subdomain_free(&tenant.subdomain)?;
        tables.tenants.insert(tenant.id.clone(), tenant.clone());
        Ok(tenant)
    }

    async fn register_tenant(&self, tenant: Tenant, admin: User) -> Result<(Tenant, User), DatabaseError> {
        let mut tables = self.tables.write().await;
        tables.ensure_subdomain_free(&tenant.subdomain)?;
        tables.ensure_user_free(&admin)?;
        tables.tenants.insert(tenant.id.clone(), tenant.clone());
        tables.users.insert(admin.id, admin.clone());
        Ok((tenant, admin))
    }

    async fn find_tenant(&self, id: &TenantId) -> Result<Option<Tenant>, DatabaseError> {
        Ok(self.tables.read().await.tenants.get(id).cloned())
    }

    async fn find_by_subdomain(&self, subdomain: &str) -> Result<Option<Tenant>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .tenants
            .values()
            .find(|t| t.subdomain.eq_ignore_ascii_case(subdomain))
            .cloned())
    }

    async fn subdomain_exists(&self, subdomain: &str) -> Result<bool, DatabaseError> {
        Ok(self.find_by_subdomain(subdomain).await?.is_some())
    }

    async fn list_tenants(&self) -> Result<Vec<Tenant>, DatabaseError> {
        let rows = self.tables.read().await.tenants.values().cloned().collect();
        Ok(newest_first(rows, |t: &Tenant| t.created_at))
    }

    async fn update_tenant(&self, id: &TenantId, update: &TenantUpdate) -> Result<Option<Tenant>, DatabaseError> {
        let mut tables = self.tables.write().await;
        let Some(tenant) = tables.tenants.get_mut(id) else {
            return Ok(None);
        };
        if let Some(name) = &update.name {
            tenant.name = name.clone();
        }
        if let Some(status) = update.status {
            tenant.status = status;
        }
        tenant.updated_at = Utc::now();
        Ok(Some(tenant.clone()))
    }

    async fn change_plan(&self, id: &TenantId, plan: Plan, limits: PlanLimits) -> Result<Option<Tenant>, DatabaseError> {
        let mut tables = self.tables.write().await;
        let Some(tenant) = tables.tenants.get_mut(id) else {
            return Ok(None);
        };
        tenant.subscription_plan = plan;
        tenant.max_users = limits.max_users;
        tenant.max_projects = limits.max_projects;
        tenant.updated_at = Utc::now();
        Ok(Some(tenant.clone()))
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: User) -> Result<User, DatabaseError> {
        let mut tables = self.tables.write().await;
        tables.ensure_user_free(&user)?;
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, tenant: Option<&TenantId>, email: &str) -> Result<Option<User>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.tenant_id.as_ref() == tenant && u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list_users(&self, tenant: &TenantId) -> Result<Vec<User>, DatabaseError> {
        let tables = self.tables.read().await;
        let rows = tables
            .users
            .values()
            .filter(|u| u.tenant_id.as_ref() == Some(tenant))
            .cloned()
            .collect();
        Ok(newest_first(rows, |u: &User| u.created_at))
    }

    async fn count_users(&self, tenant: &TenantId) -> Result<i64, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .filter(|u| u.tenant_id.as_ref() == Some(tenant))
            .count() as i64)
    }

    async fn update_user(&self, tenant: &TenantId, user: &User) -> Result<Option<User>, DatabaseError> {
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(&user.id) {
            Some(existing) if existing.tenant_id.as_ref() == Some(tenant) => {
                existing.full_name = user.full_name.clone();
                existing.role = user.role;
                existing.is_active = user.is_active;
                existing.password_hash = user.password_hash.clone();
                existing.updated_at = Utc::now();
                Ok(Some(existing.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_user(&self, tenant: &TenantId, id: Uuid) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write().await;
        let owned = tables
            .users
            .get(&id)
            .is_some_and(|u| u.tenant_id.as_ref() == Some(tenant));
        if owned {
            tables.users.remove(&id);
            // ON DELETE SET NULL in PostgreSQL
            for task in tables.tasks.values_mut().filter(|t| t.assigned_to == Some(id)) {
                task.assigned_to = None;
            }
        }
        Ok(owned)
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn insert_project(&self, project: Project) -> Result<Project, DatabaseError> {
        let mut tables = self.tables.write().await;
        tables.projects.insert(project.id, project.clone());
        Ok(project)
    }

    async fn find_project(&self, id: Uuid) -> Result<Option<Project>, DatabaseError> {
        Ok(self.tables.read().await.projects.get(&id).cloned())
    }

    async fn find_project_in_tenant(&self, tenant: &TenantId, id: Uuid) -> Result<Option<Project>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .projects
            .get(&id)
            .filter(|p| &p.tenant_id == tenant)
            .cloned())
    }

    async fn list_projects(&self, tenant: &TenantId) -> Result<Vec<Project>, DatabaseError> {
        let tables = self.tables.read().await;
        let rows = tables
            .projects
            .values()
            .filter(|p| &p.tenant_id == tenant)
            .cloned()
            .collect();
        Ok(newest_first(rows, |p: &Project| p.created_at))
    }

    async fn list_all_projects(&self) -> Result<Vec<Project>, DatabaseError> {
        let rows = self.tables.read().await.projects.values().cloned().collect();
        Ok(newest_first(rows, |p: &Project| p.created_at))
    }

    async fn count_projects(&self, tenant: &TenantId) -> Result<i64, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .projects
            .values()
            .filter(|p| &p.tenant_id == tenant)
            .count() as i64)
    }

    async fn update_project(&self, tenant: &TenantId, project: &Project) -> Result<Option<Project>, DatabaseError> {
        let mut tables = self.tables.write().await;
        match tables.projects.get_mut(&project.id) {
            Some(existing) if &existing.tenant_id == tenant => {
                existing.name = project.name.clone();
                existing.description = project.description.clone();
                existing.status = project.status.clone();
                existing.updated_at = Utc::now();
                Ok(Some(existing.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_project(&self, tenant: &TenantId, id: Uuid) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write().await;
        let owned = tables
            .projects
            .get(&id)
            .is_some_and(|p| &p.tenant_id == tenant);
        if owned {
            tables.projects.remove(&id);
            // cascade, as the foreign key does in PostgreSQL
            tables.tasks.retain(|_, t| t.project_id != id);
        }
        Ok(owned)
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn insert_task(&self, task: Task) -> Result<Task, DatabaseError> {
        let mut tables = self.tables.write().await;
        tables.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, DatabaseError> {
        Ok(self.tables.read().await.tasks.get(&id).cloned())
    }

    async fn list_project_tasks(&self, tenant: &TenantId, project_id: Uuid) -> Result<Vec<Task>, DatabaseError> {
        let tables = self.tables.read().await;
        let rows = tables
            .tasks
            .values()
            .filter(|t| &t.tenant_id == tenant && t.project_id == project_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, |t: &Task| t.created_at))
    }

    async fn list_tasks(&self, tenant: &TenantId) -> Result<Vec<Task>, DatabaseError> {
        let tables = self.tables.read().await;
        let rows = tables
            .tasks
            .values()
            .filter(|t| &t.tenant_id == tenant)
            .cloned()
            .collect();
        Ok(newest_first(rows, |t: &Task| t.created_at))
    }

    async fn list_all_tasks(&self) -> Result<Vec<Task>, DatabaseError> {
        let rows = self.tables.read().await.tasks.values().cloned().collect();
        Ok(newest_first(rows, |t: &Task| t.created_at))
    }

    async fn task_counts(&self, tenant: &TenantId, project_id: Uuid) -> Result<TaskCounts, DatabaseError> {
        let tables = self.tables.read().await;
        let mut counts = TaskCounts::default();
        for task in tables
            .tasks
            .values()
            .filter(|t| &t.tenant_id == tenant && t.project_id == project_id)
        {
            counts.total += 1;
            if task.status == TaskStatus::Completed {
                counts.completed += 1;
            }
        }
        Ok(counts)
    }

    async fn update_task(&self, tenant: &TenantId, task: &Task) -> Result<Option<Task>, DatabaseError> {
        let mut tables = self.tables.write().await;
        match tables.tasks.get_mut(&task.id) {
            Some(existing) if &existing.tenant_id == tenant => {
                existing.title = task.title.clone();
                existing.description = task.description.clone();
                existing.status = task.status;
                existing.priority = task.priority;
                existing.assigned_to = task.assigned_to;
                existing.due_date = task.due_date;
                existing.updated_at = Utc::now();
                Ok(Some(existing.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_task(&self, tenant: &TenantId, id: Uuid) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write().await;
        let owned = tables.tasks.get(&id).is_some_and(|t| &t.tenant_id == tenant);
        if owned {
            tables.tasks.remove(&id);
        }
        Ok(owned)
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn append_audit(&self, entry: AuditEntry) -> Result<(), DatabaseError> {
        self.tables.write().await.audit.push(entry);
        Ok(())
    }

    async fn list_audit(&self, tenant: &TenantId, limit: i64) -> Result<Vec<AuditEntry>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .audit
            .iter()
            .rev()
            .filter(|e| e.tenant_id.as_ref() == Some(tenant))
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}
