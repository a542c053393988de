use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgExecutor, Row};

use super::users::insert_user_row;
use super::{enum_column, map_insert_error, tenant_column, PgStore};
use crate::database::manager::DatabaseError;
use crate::database::models::{Tenant, TenantUpdate, User};
use crate::database::store::TenantStore;
use crate::quota::PlanLimits;
use crate::tenancy::TenantId;
use crate::types::Plan;

const COLUMNS: &str = "id, name, subdomain, status, subscription_plan, max_users, max_projects, created_at, updated_at";

fn tenant_from_row(row: &PgRow) -> Result<Tenant, DatabaseError> {
    Ok(Tenant {
        id: tenant_column(row, "id")?,
        name: row.try_get("name")?,
        subdomain: row.try_get("subdomain")?,
        status: enum_column(row, "status")?,
        subscription_plan: enum_column(row, "subscription_plan")?,
        max_users: row.try_get("max_users")?,
        max_projects: row.try_get("max_projects")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub(super) async fn insert_tenant_row<'e, E>(executor: E, tenant: &Tenant) -> Result<Tenant, DatabaseError>
where
    E: PgExecutor<'e>,
{
    let sql = format!(
        "INSERT INTO tenants ({COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {COLUMNS}"
    );
    let row = sqlx::query(&sql)
        .bind(tenant.id.as_str())
        .bind(&tenant.name)
        .bind(tenant.subdomain.to_ascii_lowercase())
        .bind(tenant.status.as_str())
        .bind(tenant.subscription_plan.as_str())
        .bind(tenant.max_users)
        .bind(tenant.max_projects)
        .bind(tenant.created_at)
        .bind(tenant.updated_at)
        .fetch_one(executor)
        .await
        .map_err(|e| map_insert_error(e, "tenant subdomain"))?;
    tenant_from_row(&row)
}

#[async_trait]
impl TenantStore for PgStore {
    async fn insert_tenant(&self, tenant: Tenant) -> Result<Tenant, DatabaseError> {
        insert_tenant_row(&self.pool, &tenant).await
    }

    async fn register_tenant(&self, tenant: Tenant, admin: User) -> Result<(Tenant, User), DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let tenant = insert_tenant_row(&mut *tx, &tenant).await?;
        let admin = insert_user_row(&mut *tx, &admin).await?;
        tx.commit().await?;
        Ok((tenant, admin))
    }

    async fn find_tenant(&self, id: &TenantId) -> Result<Option<Tenant>, DatabaseError> {
        let sql = format!("SELECT {COLUMNS} FROM tenants WHERE id = $1");
        sqlx::query(&sql)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(|row| tenant_from_row(&row))
            .transpose()
    }

    async fn find_by_subdomain(&self, subdomain: &str) -> Result<Option<Tenant>, DatabaseError> {
        let sql = format!("SELECT {COLUMNS} FROM tenants WHERE subdomain = $1");
        sqlx::query(&sql)
            .bind(subdomain.to_ascii_lowercase())
            .fetch_optional(&self.pool)
            .await?
            .map(|row| tenant_from_row(&row))
            .transpose()
    }

    async fn subdomain_exists(&self, subdomain: &str) -> Result<bool, DatabaseError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tenants WHERE subdomain = $1)")
            .bind(subdomain.to_ascii_lowercase())
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn list_tenants(&self) -> Result<Vec<Tenant>, DatabaseError> {
        let sql = format!("SELECT {COLUMNS} FROM tenants ORDER BY created_at DESC");
        sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(tenant_from_row)
            .collect()
    }

    async fn update_tenant(&self, id: &TenantId, update: &TenantUpdate) -> Result<Option<Tenant>, DatabaseError> {
        let sql = format!(
            "UPDATE tenants SET name = COALESCE($2, name), status = COALESCE($3, status), updated_at = NOW() \
             WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query(&sql)
            .bind(id.as_str())
            .bind(update.name.as_deref())
            .bind(update.status.map(|s| s.as_str()))
            .fetch_optional(&self.pool)
            .await?
            .map(|row| tenant_from_row(&row))
            .transpose()
    }

    async fn change_plan(&self, id: &TenantId, plan: Plan, limits: PlanLimits) -> Result<Option<Tenant>, DatabaseError> {
        // Single statement so plan and ceilings can never be observed apart.
        let sql = format!(
            "UPDATE tenants SET subscription_plan = $2, max_users = $3, max_projects = $4, updated_at = NOW() \
             WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query(&sql)
            .bind(id.as_str())
            .bind(plan.as_str())
            .bind(limits.max_users)
            .bind(limits.max_projects)
            .fetch_optional(&self.pool)
            .await?
            .map(|row| tenant_from_row(&row))
            .transpose()
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        crate::database::DatabaseManager::health_check(&self.pool).await
    }
}
