use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::quota::{PlanLimits, TenantQuota};
use crate::tenancy::TenantId;
use crate::types::{Plan, TenantStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    pub subdomain: String,
    pub status: TenantStatus,
    pub subscription_plan: Plan,
    pub max_users: i32,
    pub max_projects: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    /// New active tenant with the default ceilings of `plan`.
    pub fn new(name: impl Into<String>, subdomain: impl Into<String>, plan: Plan) -> Self {
        let limits = PlanLimits::for_plan(plan);
        let now = Utc::now();
        Self {
            id: TenantId::generate(),
            name: name.into(),
            subdomain: subdomain.into(),
            status: TenantStatus::Active,
            subscription_plan: plan,
            max_users: limits.max_users,
            max_projects: limits.max_projects,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn quota(&self) -> TenantQuota {
        TenantQuota {
            tenant_id: self.id.clone(),
            plan: self.subscription_plan,
            limits: PlanLimits {
                max_users: self.max_users,
                max_projects: self.max_projects,
            },
        }
    }
}

/// Profile fields a tenant update may touch. Plan changes go through
/// `TenantStore::change_plan` instead.
#[derive(Debug, Clone, Default)]
pub struct TenantUpdate {
    pub name: Option<String>,
    pub status: Option<TenantStatus>,
}

/// Public branding view served to unauthenticated subdomain lookups.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantBranding {
    pub id: TenantId,
    pub name: String,
    pub subdomain: String,
}

impl From<&Tenant> for TenantBranding {
    fn from(tenant: &Tenant) -> Self {
        Self {
            id: tenant.id.clone(),
            name: tenant.name.clone(),
            subdomain: tenant.subdomain.clone(),
        }
    }
}
