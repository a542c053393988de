use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use super::{enum_column, tenant_column, PgStore};
use crate::database::manager::DatabaseError;
use crate::database::models::{Task, TaskCounts};
use crate::database::store::TaskStore;
use crate::tenancy::TenantId;

const COLUMNS: &str =
    "id, project_id, tenant_id, title, description, status, priority, assigned_to, due_date, created_at, updated_at";

fn task_from_row(row: &PgRow) -> Result<Task, DatabaseError> {
    Ok(Task {
        id: row.try_get("id")?,
        project_id: row.try_get("project_id")?,
        tenant_id: tenant_column(row, "tenant_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        status: enum_column(row, "status")?,
        priority: enum_column(row, "priority")?,
        assigned_to: row.try_get("assigned_to")?,
        due_date: row.try_get("due_date")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl TaskStore for PgStore {
    async fn insert_task(&self, task: Task) -> Result<Task, DatabaseError> {
        let sql = format!(
            "INSERT INTO tasks ({COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING {COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(task.id)
            .bind(task.project_id)
            .bind(task.tenant_id.as_str())
            .bind(&task.title)
            .bind(task.description.as_deref())
            .bind(task.status.as_str())
            .bind(task.priority.as_str())
            .bind(task.assigned_to)
            .bind(task.due_date)
            .bind(task.created_at)
            .bind(task.updated_at)
            .fetch_one(&self.pool)
            .await?;
        task_from_row(&row)
    }

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, DatabaseError> {
        let sql = format!("SELECT {COLUMNS} FROM tasks WHERE id = $1");
        sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(|row| task_from_row(&row))
            .transpose()
    }

    async fn list_project_tasks(&self, tenant: &TenantId, project_id: Uuid) -> Result<Vec<Task>, DatabaseError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM tasks WHERE tenant_id = $1 AND project_id = $2 ORDER BY created_at DESC"
        );
        sqlx::query(&sql)
            .bind(tenant.as_str())
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(task_from_row)
            .collect()
    }

    async fn list_tasks(&self, tenant: &TenantId) -> Result<Vec<Task>, DatabaseError> {
        let sql = format!("SELECT {COLUMNS} FROM tasks WHERE tenant_id = $1 ORDER BY created_at DESC");
        sqlx::query(&sql)
            .bind(tenant.as_str())
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(task_from_row)
            .collect()
    }

    async fn list_all_tasks(&self) -> Result<Vec<Task>, DatabaseError> {
        let sql = format!("SELECT {COLUMNS} FROM tasks ORDER BY created_at DESC");
        sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(task_from_row)
            .collect()
    }

    async fn task_counts(&self, tenant: &TenantId, project_id: Uuid) -> Result<TaskCounts, DatabaseError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total, COUNT(*) FILTER (WHERE status = 'completed') AS completed \
             FROM tasks WHERE tenant_id = $1 AND project_id = $2",
        )
        .bind(tenant.as_str())
        .bind(project_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(TaskCounts {
            total: row.try_get("total")?,
            completed: row.try_get("completed")?,
        })
    }

    async fn update_task(&self, tenant: &TenantId, task: &Task) -> Result<Option<Task>, DatabaseError> {
        let sql = format!(
            "UPDATE tasks SET title = $3, description = $4, status = $5, priority = $6, assigned_to = $7, \
             due_date = $8, updated_at = NOW() WHERE id = $1 AND tenant_id = $2 RETURNING {COLUMNS}"
        );
        sqlx::query(&sql)
            .bind(task.id)
            .bind(tenant.as_str())
            .bind(&task.title)
            .bind(task.description.as_deref())
            .bind(task.status.as_str())
            .bind(task.priority.as_str())
            .bind(task.assigned_to)
            .bind(task.due_date)
            .fetch_optional(&self.pool)
            .await?
            .map(|row| task_from_row(&row))
            .transpose()
    }

    async fn delete_task(&self, tenant: &TenantId, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
