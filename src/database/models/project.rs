use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tenancy::TenantId;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub name: String,
    pub description: Option<String>,
    /// active, archived or completed
    pub status: String,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(
        tenant_id: TenantId,
        name: impl Into<String>,
        description: Option<String>,
        created_by: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            name: name.into(),
            description,
            status: "active".to_string(),
            created_by,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Project plus its task counters, as returned by the project endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectWithStats {
    #[serde(flatten)]
    pub project: Project,
    pub task_count: i64,
    pub completed_task_count: i64,
}
