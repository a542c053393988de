// quota.rs - Subscription-tier quota enforcement
//
// Check-then-create is serialized per tenant: callers hold a QuotaPermit from
// before the tenant-filtered count until the insert has finished. This closes
// the race within one process; replicas sharing a database still rely on the
// count being close enough.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::tenancy::TenantId;
use crate::types::{Plan, ResourceKind};

/// Per-plan ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLimits {
    pub max_users: i32,
    pub max_projects: i32,
}

impl PlanLimits {
    /// Default mapping, non-decreasing with the tier.
    pub fn for_plan(plan: Plan) -> Self {
        match plan {
            Plan::Free => Self { max_users: 5, max_projects: 3 },
            Plan::Pro => Self { max_users: 25, max_projects: 15 },
            Plan::Enterprise => Self { max_users: 100, max_projects: 50 },
        }
    }

    pub fn ceiling(&self, kind: ResourceKind) -> i64 {
        match kind {
            ResourceKind::User => self.max_users as i64,
            ResourceKind::Project => self.max_projects as i64,
        }
    }
}

/// Quota view of a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantQuota {
    pub tenant_id: TenantId,
    pub plan: Plan,
    pub limits: PlanLimits,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuotaError {
    #[error("{kind} limit reached for your {plan} plan ({limit})")]
    Exceeded {
        kind: ResourceKind,
        plan: Plan,
        limit: i64,
    },
}

/// Held across a check-then-create. Dropping it lets the next creation for
/// the same tenant proceed.
#[derive(Debug)]
pub struct QuotaPermit {
    _guard: OwnedMutexGuard<()>,
}

#[derive(Debug, Default)]
pub struct QuotaEnforcer {
    locks: RwLock<HashMap<TenantId, Arc<Mutex<()>>>>,
}

impl QuotaEnforcer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects when one more `kind` would push `current_count` past the ceiling.
    /// `current_count` must come from a tenant-filtered count query.
    pub fn check(quota: &TenantQuota, kind: ResourceKind, current_count: i64) -> Result<(), QuotaError> {
        let limit = quota.limits.ceiling(kind);
        if current_count >= limit {
            tracing::info!(
                tenant = %quota.tenant_id,
                kind = %kind,
                current_count,
                limit,
                "Quota exceeded"
            );
            return Err(QuotaError::Exceeded {
                kind,
                plan: quota.plan,
                limit,
            });
        }
        Ok(())
    }

    /// Waits for exclusive creation rights for `tenant_id`.
    pub async fn acquire(&self, tenant_id: &TenantId) -> QuotaPermit {
        let lock = {
            let locks = self.locks.read().await;
            locks.get(tenant_id).cloned()
        };
        let lock = match lock {
            Some(lock) => lock,
            None => {
                let mut locks = self.locks.write().await;
                locks
                    .entry(tenant_id.clone())
                    .or_insert_with(|| Arc::new(Mutex::new(())))
                    .clone()
            }
        };
        QuotaPermit {
            _guard: lock.lock_owned().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::time::Duration;

    fn free_quota() -> TenantQuota {
        TenantQuota {
            tenant_id: TenantId::new("acme").unwrap(),
            plan: Plan::Free,
            limits: PlanLimits::for_plan(Plan::Free),
        }
    }

    #[test]
    fn default_ceilings_grow_with_tier() {
        let plans = [Plan::Free, Plan::Pro, Plan::Enterprise];
        for pair in plans.windows(2) {
            let (lower, higher) = (PlanLimits::for_plan(pair[0]), PlanLimits::for_plan(pair[1]));
            assert!(lower.max_users <= higher.max_users);
            assert!(lower.max_projects <= higher.max_projects);
        }
    }

    #[test]
    fn fourth_project_on_free_plan_is_rejected() {
        let quota = free_quota();
        let err = QuotaEnforcer::check(&quota, ResourceKind::Project, 3).unwrap_err();
        assert_eq!(
            err,
            QuotaError::Exceeded { kind: ResourceKind::Project, plan: Plan::Free, limit: 3 }
        );
        assert!(err.to_string().contains("free plan"));
        assert!(QuotaEnforcer::check(&quota, ResourceKind::Project, 2).is_ok());
    }

    #[test]
    fn user_ceiling_is_separate_from_projects() {
        let quota = free_quota();
        assert!(QuotaEnforcer::check(&quota, ResourceKind::User, 4).is_ok());
        assert!(QuotaEnforcer::check(&quota, ResourceKind::User, 5).is_err());
    }

    #[tokio::test]
    async fn permits_serialize_concurrent_creations() {
        let enforcer = Arc::new(QuotaEnforcer::new());
        let count = Arc::new(AtomicI64::new(0));
        let quota = Arc::new(free_quota());

        let mut handles = Vec::new();
        for _ in 0..10 {
            let (enforcer, count, quota) = (enforcer.clone(), count.clone(), quota.clone());
            handles.push(tokio::spawn(async move {
                let _permit = enforcer.acquire(&quota.tenant_id).await;
                let current = count.load(Ordering::SeqCst);
                if QuotaEnforcer::check(&quota, ResourceKind::Project, current).is_ok() {
                    tokio::time::sleep(Duration::from_millis(2)).await;
                    count.fetch_add(1, Ordering::SeqCst);
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn other_tenants_are_not_blocked() {
        let enforcer = QuotaEnforcer::new();
        let _held = enforcer.acquire(&TenantId::new("a").unwrap()).await;
        let other = tokio::time::timeout(
            Duration::from_millis(200),
            enforcer.acquire(&TenantId::new("b").unwrap()),
        )
        .await;
        assert!(other.is_ok());
    }
}
