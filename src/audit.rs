// audit.rs - Best-effort audit trail of mutating actions
//
// The recorder takes the tenant from the request's TenantContext at call
// time, never from the caller. A failed append is logged and swallowed: it
// must not roll back or block the mutation it describes.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::database::models::AuditEntry;
use crate::database::store::AuditStore;
use crate::tenancy::{RequestContext, TenantId};
use crate::types::ParseEnumError;

/// Closed vocabulary of audited actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    TenantRegistration,
    UpdateTenant,
    ChangePlan,
    CreateUser,
    UpdateUser,
    DeleteUser,
    CreateProject,
    UpdateProject,
    DeleteProject,
    CreateTask,
    UpdateTask,
    UpdateTaskStatus,
    DeleteTask,
    UserLogout,
}

impl AuditAction {
    pub const ALL: [AuditAction; 14] = [
        AuditAction::TenantRegistration,
        AuditAction::UpdateTenant,
        AuditAction::ChangePlan,
        AuditAction::CreateUser,
        AuditAction::UpdateUser,
        AuditAction::DeleteUser,
        AuditAction::CreateProject,
        AuditAction::UpdateProject,
        AuditAction::DeleteProject,
        AuditAction::CreateTask,
        AuditAction::UpdateTask,
        AuditAction::UpdateTaskStatus,
        AuditAction::DeleteTask,
        AuditAction::UserLogout,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::TenantRegistration => "TENANT_REGISTRATION",
            AuditAction::UpdateTenant => "UPDATE_TENANT",
            AuditAction::ChangePlan => "CHANGE_PLAN",
            AuditAction::CreateUser => "CREATE_USER",
            AuditAction::UpdateUser => "UPDATE_USER",
            AuditAction::DeleteUser => "DELETE_USER",
            AuditAction::CreateProject => "CREATE_PROJECT",
            AuditAction::UpdateProject => "UPDATE_PROJECT",
            AuditAction::DeleteProject => "DELETE_PROJECT",
            AuditAction::CreateTask => "CREATE_TASK",
            AuditAction::UpdateTask => "UPDATE_TASK",
            AuditAction::UpdateTaskStatus => "UPDATE_TASK_STATUS",
            AuditAction::DeleteTask => "DELETE_TASK",
            AuditAction::UserLogout => "USER_LOGOUT",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AuditAction::ALL
            .iter()
            .copied()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| ParseEnumError {
                kind: "audit action",
                value: s.to_string(),
            })
    }
}

pub struct AuditRecorder {
    store: Arc<dyn AuditStore>,
    enabled: bool,
}

impl AuditRecorder {
    pub fn new(store: Arc<dyn AuditStore>, enabled: bool) -> Self {
        Self { store, enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Appends one entry tagged with the tenant currently bound to `ctx`.
    pub async fn record(&self, ctx: &RequestContext, action: AuditAction, detail: impl Into<String>) {
        let actor = ctx.principal().map(|p| p.subject.clone());
        self.record_for(ctx.tenant_id(), actor, action, detail).await;
    }

    /// Appends one entry for an explicit tenant and actor. Used where the
    /// request binding does not describe the tenant being acted on.
    pub async fn record_for(
        &self,
        tenant_id: Option<TenantId>,
        actor: Option<String>,
        action: AuditAction,
        detail: impl Into<String>,
    ) {
        if !self.enabled {
            return;
        }

        let entry = AuditEntry {
            id: Uuid::new_v4(),
            tenant_id,
            actor,
            action,
            details: detail.into(),
            timestamp: Utc::now(),
        };

        tracing::debug!(
            action = %entry.action,
            tenant = ?entry.tenant_id.as_ref().map(|t| t.as_str()),
            "Recording audit entry"
        );

        if let Err(e) = self.store.append_audit(entry).await {
            tracing::error!(action = %action, error = %e, "Failed to write audit entry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::manager::DatabaseError;
    use crate::database::MemoryStore;
    use crate::tenancy::{BindingSource, TenantContext, TenantId};
    use async_trait::async_trait;

    struct BrokenAuditStore;

    #[async_trait]
    impl AuditStore for BrokenAuditStore {
        async fn append_audit(&self, _entry: AuditEntry) -> Result<(), DatabaseError> {
            Err(DatabaseError::Unavailable("audit table offline".to_string()))
        }

        async fn list_audit(&self, _tenant: &TenantId, _limit: i64) -> Result<Vec<AuditEntry>, DatabaseError> {
            Ok(vec![])
        }
    }

    fn bound_context(tenant: &TenantId) -> RequestContext {
        let context = TenantContext::new();
        context.bind(tenant.clone(), BindingSource::Token);
        RequestContext::new(context, None)
    }

    #[test]
    fn test_action_codes_round_trip() {
        for action in AuditAction::ALL {
            assert_eq!(action.as_str().parse::<AuditAction>().unwrap(), action);
        }
        assert!("DROP_TABLE".parse::<AuditAction>().is_err());
    }

    #[tokio::test]
    async fn test_entry_is_tagged_with_bound_tenant() {
        let store = Arc::new(MemoryStore::new());
        let recorder = AuditRecorder::new(store.clone(), true);
        let tenant = TenantId::generate();

        recorder
            .record(&bound_context(&tenant), AuditAction::CreateTask, "Created task: Write docs")
            .await;

        let entries = store.list_audit(&tenant, 10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, AuditAction::CreateTask);
        assert_eq!(entries[0].tenant_id.as_ref(), Some(&tenant));
    }

    #[tokio::test]
    async fn test_store_failure_is_swallowed() {
        let recorder = AuditRecorder::new(Arc::new(BrokenAuditStore), true);
        let tenant = TenantId::generate();

        // returns normally; nothing to assert beyond not panicking
        recorder
            .record(&bound_context(&tenant), AuditAction::DeleteUser, "Deleted user")
            .await;
    }

    #[tokio::test]
    async fn test_disabled_recorder_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        let recorder = AuditRecorder::new(store.clone(), false);
        let tenant = TenantId::generate();

        recorder
            .record(&bound_context(&tenant), AuditAction::CreateProject, "Created project")
            .await;

        assert!(store.list_audit(&tenant, 10).await.unwrap().is_empty());
    }
}
