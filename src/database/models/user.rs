use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tenancy::TenantId;
use crate::types::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    /// None only for platform super admins.
    pub tenant_id: Option<TenantId>,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub full_name: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        tenant_id: Option<TenantId>,
        email: impl Into<String>,
        password_hash: String,
        full_name: impl Into<String>,
        role: Role,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            email: email.into(),
            password_hash,
            full_name: full_name.into(),
            role,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}
