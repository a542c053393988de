use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::audit::{AuditAction, AuditRecorder};
use crate::authz::{ensure_same_tenant, permissions};
use crate::database::models::{Task, TaskPriority, TaskStatus};
use crate::database::Stores;
use crate::tenancy::{RequestContext, TenantId};

use super::{required, ServiceError, ServiceResult};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub assigned_to: Option<Uuid>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusChange {
    pub status: TaskStatus,
}

pub struct TaskService {
    stores: Stores,
    audit: Arc<AuditRecorder>,
}

impl TaskService {
    pub fn new(stores: Stores, audit: Arc<AuditRecorder>) -> Self {
        Self { stores, audit }
    }

    async fn ensure_project_owned(&self, bound: &TenantId, project_id: Uuid) -> ServiceResult<()> {
        let project = self
            .stores
            .projects
            .find_project(project_id)
            .await?
            .ok_or(ServiceError::NotFound("Project"))?;
        ensure_same_tenant(&project.tenant_id, Some(bound))?;
        Ok(())
    }

    /// Assignees must be members of the bound tenant.
    async fn ensure_assignable(&self, bound: &TenantId, user_id: Uuid) -> ServiceResult<()> {
        let user = self
            .stores
            .users
            .find_user(user_id)
            .await?
            .ok_or(ServiceError::NotFound("Assigned user"))?;
        if user.tenant_id.as_ref() != Some(bound) {
            return Err(ServiceError::invalid(
                "assignedTo",
                "user does not belong to your organization",
            ));
        }
        Ok(())
    }

    async fn load_owned(&self, ctx: &RequestContext, id: Uuid) -> ServiceResult<(TenantId, Task)> {
        let bound = ctx.require_tenant()?;
        let task = self
            .stores
            .tasks
            .find_task(id)
            .await?
            .ok_or(ServiceError::NotFound("Task"))?;
        ensure_same_tenant(&task.tenant_id, Some(&bound))?;
        Ok((bound, task))
    }

    async fn save(&self, bound: &TenantId, task: &Task) -> ServiceResult<Task> {
        self.stores
            .tasks
            .update_task(bound, task)
            .await?
            .ok_or(ServiceError::NotFound("Task"))
    }

    pub async fn list_for_project(&self, ctx: &RequestContext, project_id: Uuid) -> ServiceResult<Vec<Task>> {
        ctx.authorize(&permissions::MANAGE_TASKS)?;
        let bound = ctx.require_tenant()?;
        self.ensure_project_owned(&bound, project_id).await?;
        Ok(self.stores.tasks.list_project_tasks(&bound, project_id).await?)
    }

    /// Bound tenant's tasks; every task for super admins.
    pub async fn list(&self, ctx: &RequestContext) -> ServiceResult<Vec<Task>> {
        ctx.authorize(&permissions::LIST_TASKS)?;
        if ctx.is_super_admin() {
            return Ok(self.stores.tasks.list_all_tasks().await?);
        }
        let bound = ctx.require_tenant()?;
        Ok(self.stores.tasks.list_tasks(&bound).await?)
    }

    pub async fn create(&self, ctx: &RequestContext, project_id: Uuid, request: CreateTaskRequest) -> ServiceResult<Task> {
        ctx.authorize(&permissions::MANAGE_TASKS)?;
        let bound = ctx.require_tenant()?;
        let title = required("title", &request.title)?;

        self.ensure_project_owned(&bound, project_id).await?;
        if let Some(assignee) = request.assigned_to {
            self.ensure_assignable(&bound, assignee).await?;
        }

        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            project_id,
            tenant_id: bound,
            title,
            description: request.description,
            status: request.status.unwrap_or(TaskStatus::Todo),
            priority: request.priority.unwrap_or(TaskPriority::Medium),
            assigned_to: request.assigned_to,
            due_date: request.due_date,
            created_at: now,
            updated_at: now,
        };

        self.audit
            .record(ctx, AuditAction::CreateTask, format!("Task created: {}", task.title))
            .await;

        Ok(self.stores.tasks.insert_task(task).await?)
    }

    pub async fn update(&self, ctx: &RequestContext, id: Uuid, request: UpdateTaskRequest) -> ServiceResult<Task> {
        ctx.authorize(&permissions::MANAGE_TASKS)?;
        let (bound, mut task) = self.load_owned(ctx, id).await?;

        if let Some(title) = &request.title {
            task.title = required("title", title)?;
        }
        if request.description.is_some() {
            task.description = request.description;
        }
        if let Some(status) = request.status {
            task.status = status;
        }
        if let Some(priority) = request.priority {
            task.priority = priority;
        }
        if let Some(assignee) = request.assigned_to {
            self.ensure_assignable(&bound, assignee).await?;
            task.assigned_to = Some(assignee);
        }
        if request.due_date.is_some() {
            task.due_date = request.due_date;
        }

        self.audit
            .record(ctx, AuditAction::UpdateTask, format!("Task ID {} updated", id))
            .await;

        self.save(&bound, &task).await
    }

    pub async fn update_status(&self, ctx: &RequestContext, id: Uuid, status: TaskStatus) -> ServiceResult<Task> {
        ctx.authorize(&permissions::MANAGE_TASKS)?;
        let (bound, mut task) = self.load_owned(ctx, id).await?;
        task.status = status;

        self.audit
            .record(
                ctx,
                AuditAction::UpdateTaskStatus,
                format!("Task ID {} status changed to {}", id, status.as_str()),
            )
            .await;

        self.save(&bound, &task).await
    }

    pub async fn delete(&self, ctx: &RequestContext, id: Uuid) -> ServiceResult<()> {
        ctx.authorize(&permissions::MANAGE_TASKS)?;
        let (bound, _) = self.load_owned(ctx, id).await?;

        self.audit
            .record(ctx, AuditAction::DeleteTask, format!("Task ID {} deleted", id))
            .await;

        if !self.stores.tasks.delete_task(&bound, id).await? {
            return Err(ServiceError::NotFound("Task"));
        }
        Ok(())
    }
}
