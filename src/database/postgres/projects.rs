use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use super::{tenant_column, PgStore};
use crate::database::manager::DatabaseError;
use crate::database::models::Project;
use crate::database::store::ProjectStore;
use crate::tenancy::TenantId;

const COLUMNS: &str = "id, tenant_id, name, description, status, created_by, created_at, updated_at";

fn project_from_row(row: &PgRow) -> Result<Project, DatabaseError> {
    Ok(Project {
        id: row.try_get("id")?,
        tenant_id: tenant_column(row, "tenant_id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        status: row.try_get("status")?,
        created_by: row.try_get("created_by")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl ProjectStore for PgStore {
    async fn insert_project(&self, project: Project) -> Result<Project, DatabaseError> {
        let sql = format!(
            "INSERT INTO projects ({COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(project.id)
            .bind(project.tenant_id.as_str())
            .bind(&project.name)
            .bind(project.description.as_deref())
            .bind(&project.status)
            .bind(project.created_by.as_deref())
            .bind(project.created_at)
            .bind(project.updated_at)
            .fetch_one(&self.pool)
            .await?;
        project_from_row(&row)
    }

    async fn find_project(&self, id: Uuid) -> Result<Option<Project>, DatabaseError> {
        let sql = format!("SELECT {COLUMNS} FROM projects WHERE id = $1");
        sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(|row| project_from_row(&row))
            .transpose()
    }

    async fn find_project_in_tenant(&self, tenant: &TenantId, id: Uuid) -> Result<Option<Project>, DatabaseError> {
        let sql = format!("SELECT {COLUMNS} FROM projects WHERE id = $1 AND tenant_id = $2");
        sqlx::query(&sql)
            .bind(id)
            .bind(tenant.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(|row| project_from_row(&row))
            .transpose()
    }

    async fn list_projects(&self, tenant: &TenantId) -> Result<Vec<Project>, DatabaseError> {
        let sql = format!("SELECT {COLUMNS} FROM projects WHERE tenant_id = $1 ORDER BY created_at DESC");
        sqlx::query(&sql)
            .bind(tenant.as_str())
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(project_from_row)
            .collect()
    }

    async fn list_all_projects(&self) -> Result<Vec<Project>, DatabaseError> {
        let sql = format!("SELECT {COLUMNS} FROM projects ORDER BY created_at DESC");
        sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(project_from_row)
            .collect()
    }

    async fn count_projects(&self, tenant: &TenantId) -> Result<i64, DatabaseError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects WHERE tenant_id = $1")
            .bind(tenant.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn update_project(&self, tenant: &TenantId, project: &Project) -> Result<Option<Project>, DatabaseError> {
        let sql = format!(
            "UPDATE projects SET name = $3, description = $4, status = $5, updated_at = NOW() \
             WHERE id = $1 AND tenant_id = $2 RETURNING {COLUMNS}"
        );
        sqlx::query(&sql)
            .bind(project.id)
            .bind(tenant.as_str())
            .bind(&project.name)
            .bind(project.description.as_deref())
            .bind(&project.status)
            .fetch_optional(&self.pool)
            .await?
            .map(|row| project_from_row(&row))
            .transpose()
    }

    async fn delete_project(&self, tenant: &TenantId, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
