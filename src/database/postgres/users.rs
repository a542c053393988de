use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgExecutor, Row};
use uuid::Uuid;

use super::{enum_column, map_insert_error, optional_tenant_column, PgStore};
use crate::database::manager::DatabaseError;
use crate::database::models::User;
use crate::database::store::UserStore;
use crate::tenancy::TenantId;

const COLUMNS: &str = "id, tenant_id, email, password_hash, full_name, role, is_active, created_at, updated_at";

fn user_from_row(row: &PgRow) -> Result<User, DatabaseError> {
    Ok(User {
        id: row.try_get("id")?,
        tenant_id: optional_tenant_column(row, "tenant_id")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        full_name: row.try_get("full_name")?,
        role: enum_column(row, "role")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub(super) async fn insert_user_row<'e, E>(executor: E, user: &User) -> Result<User, DatabaseError>
where
    E: PgExecutor<'e>,
{
    let sql = format!(
        "INSERT INTO users ({COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {COLUMNS}"
    );
    let row = sqlx::query(&sql)
        .bind(user.id)
        .bind(user.tenant_id.as_ref().map(|t| t.as_str()))
        .bind(user.email.to_ascii_lowercase())
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(user.role.as_str())
        .bind(user.is_active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(executor)
        .await
        .map_err(|e| map_insert_error(e, "user email"))?;
    user_from_row(&row)
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: User) -> Result<User, DatabaseError> {
        insert_user_row(&self.pool, &user).await
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(|row| user_from_row(&row))
            .transpose()
    }

    async fn find_user_by_email(&self, tenant: Option<&TenantId>, email: &str) -> Result<Option<User>, DatabaseError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM users WHERE tenant_id IS NOT DISTINCT FROM $1 AND email = $2"
        );
        sqlx::query(&sql)
            .bind(tenant.map(|t| t.as_str()))
            .bind(email.to_ascii_lowercase())
            .fetch_optional(&self.pool)
            .await?
            .map(|row| user_from_row(&row))
            .transpose()
    }

    async fn list_users(&self, tenant: &TenantId) -> Result<Vec<User>, DatabaseError> {
        let sql = format!("SELECT {COLUMNS} FROM users WHERE tenant_id = $1 ORDER BY created_at DESC");
        sqlx::query(&sql)
            .bind(tenant.as_str())
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(user_from_row)
            .collect()
    }

    async fn count_users(&self, tenant: &TenantId) -> Result<i64, DatabaseError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE tenant_id = $1")
            .bind(tenant.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn update_user(&self, tenant: &TenantId, user: &User) -> Result<Option<User>, DatabaseError> {
        let sql = format!(
            "UPDATE users SET full_name = $3, role = $4, is_active = $5, password_hash = $6, updated_at = NOW() \
             WHERE id = $1 AND tenant_id = $2 RETURNING {COLUMNS}"
        );
        sqlx::query(&sql)
            .bind(user.id)
            .bind(tenant.as_str())
            .bind(&user.full_name)
            .bind(user.role.as_str())
            .bind(user.is_active)
            .bind(&user.password_hash)
            .fetch_optional(&self.pool)
            .await?
            .map(|row| user_from_row(&row))
            .transpose()
    }

    async fn delete_user(&self, tenant: &TenantId, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
