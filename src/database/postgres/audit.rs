use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::Row;

use super::{enum_column, optional_tenant_column, PgStore};
use crate::database::manager::DatabaseError;
use crate::database::models::AuditEntry;
use crate::database::store::AuditStore;
use crate::tenancy::TenantId;

fn entry_from_row(row: &PgRow) -> Result<AuditEntry, DatabaseError> {
    Ok(AuditEntry {
        id: row.try_get("id")?,
        tenant_id: optional_tenant_column(row, "tenant_id")?,
        actor: row.try_get("actor")?,
        action: enum_column(row, "action")?,
        details: row.try_get("details")?,
        timestamp: row.try_get("timestamp")?,
    })
}

#[async_trait]
impl AuditStore for PgStore {
    async fn append_audit(&self, entry: AuditEntry) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO audit_logs (id, tenant_id, actor, action, details, timestamp) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(entry.id)
        .bind(entry.tenant_id.as_ref().map(|t| t.as_str()))
        .bind(entry.actor.as_deref())
        .bind(entry.action.as_str())
        .bind(&entry.details)
        .bind(entry.timestamp)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_audit(&self, tenant: &TenantId, limit: i64) -> Result<Vec<AuditEntry>, DatabaseError> {
        sqlx::query(
            "SELECT id, tenant_id, actor, action, details, timestamp FROM audit_logs \
             WHERE tenant_id = $1 ORDER BY timestamp DESC LIMIT $2",
        )
        .bind(tenant.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(entry_from_row)
        .collect()
    }
}
