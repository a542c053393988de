use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::audit::AuditAction;
use crate::tenancy::TenantId;

/// Append-only audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: Uuid,
    /// Tenant bound to the request when the entry was written.
    pub tenant_id: Option<TenantId>,
    pub actor: Option<String>,
    pub action: AuditAction,
    pub details: String,
    pub timestamp: DateTime<Utc>,
}
