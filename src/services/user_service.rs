use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::audit::{AuditAction, AuditRecorder};
use crate::auth::password::hash_password;
use crate::authz::{ensure_same_tenant, permissions, AuthzError};
use crate::database::models::User;
use crate::database::Stores;
use crate::quota::QuotaEnforcer;
use crate::tenancy::{RequestContext, TenantId};
use crate::types::{ResourceKind, Role};

use super::{normalized_email, required, strong_enough, ServiceError, ServiceResult};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub password: Option<String>,
    pub is_active: Option<bool>,
}

pub struct UserService {
    stores: Stores,
    quota: Arc<QuotaEnforcer>,
    audit: Arc<AuditRecorder>,
}

impl UserService {
    pub fn new(stores: Stores, quota: Arc<QuotaEnforcer>, audit: Arc<AuditRecorder>) -> Self {
        Self { stores, quota, audit }
    }

    /// Loads `id` and checks it belongs to the bound tenant.
    async fn load_owned(&self, ctx: &RequestContext, id: Uuid) -> ServiceResult<(TenantId, User)> {
        let bound = ctx.require_tenant()?;
        let user = self
            .stores
            .users
            .find_user(id)
            .await?
            .ok_or(ServiceError::NotFound("User"))?;
        match &user.tenant_id {
            Some(owner) => ensure_same_tenant(owner, Some(&bound))?,
            None => return Err(AuthzError::CrossTenant.into()),
        }
        Ok((bound, user))
    }

    pub async fn list(&self, ctx: &RequestContext, tenant_id: &TenantId) -> ServiceResult<Vec<User>> {
        ctx.authorize(&permissions::LIST_USERS)?;
        let bound = ctx.require_tenant()?;
        ensure_same_tenant(tenant_id, Some(&bound))?;
        Ok(self.stores.users.list_users(&bound).await?)
    }

    pub async fn create(
        &self,
        ctx: &RequestContext,
        tenant_id: &TenantId,
        request: CreateUserRequest,
    ) -> ServiceResult<User> {
        let principal = ctx.authorize(&permissions::CREATE_USER)?;
        let bound = ctx.require_tenant()?;
        ensure_same_tenant(tenant_id, Some(&bound))?;

        let email = normalized_email("email", &request.email)?;
        let full_name = required("fullName", &request.full_name)?;
        strong_enough("password", &request.password)?;
        let role = request.role.unwrap_or(Role::TenantUser);
        if role == Role::SuperAdmin {
            return Err(ServiceError::invalid("role", "must be tenant_admin or user"));
        }

        let tenant = self
            .stores
            .tenants
            .find_tenant(&bound)
            .await?
            .ok_or_else(|| ServiceError::TenantNotFound(bound.to_string()))?;

        let _permit = self.quota.acquire(&bound).await;
        let count = self.stores.users.count_users(&bound).await?;
        QuotaEnforcer::check(&tenant.quota(), ResourceKind::User, count)?;

        if self
            .stores
            .users
            .find_user_by_email(Some(&bound), &email)
            .await?
            .is_some()
        {
            return Err(ServiceError::Conflict(
                "Email already exists in this organization".to_string(),
            ));
        }

        let password_hash = hash_password(&request.password)?;
        let user = User::new(Some(bound), email, password_hash, full_name, role);

        self.audit
            .record(
                ctx,
                AuditAction::CreateUser,
                format!("New user {} added by: {}", user.email, principal.subject),
            )
            .await;

        Ok(self.stores.users.insert_user(user).await?)
    }

    pub async fn update(&self, ctx: &RequestContext, id: Uuid, request: UpdateUserRequest) -> ServiceResult<User> {
        let principal = ctx.authorize(&permissions::UPDATE_USER)?;
        let (bound, mut user) = self.load_owned(ctx, id).await?;

        if principal.role == Role::TenantUser {
            if !user.email.eq_ignore_ascii_case(&principal.subject) {
                return Err(AuthzError::Denied("Users can only update their own profile").into());
            }
            if request.role.is_some() || request.is_active.is_some() {
                return Err(AuthzError::Denied("Users cannot change their role or status").into());
            }
        }

        if let Some(full_name) = &request.full_name {
            user.full_name = required("fullName", full_name)?;
        }
        if let Some(role) = request.role {
            if role == Role::SuperAdmin {
                return Err(ServiceError::invalid("role", "must be tenant_admin or user"));
            }
            user.role = role;
        }
        if let Some(is_active) = request.is_active {
            user.is_active = is_active;
        }
        if let Some(password) = request.password.as_deref().filter(|p| !p.is_empty()) {
            strong_enough("password", password)?;
            user.password_hash = hash_password(password)?;
        }

        self.audit
            .record(
                ctx,
                AuditAction::UpdateUser,
                format!("User {} updated by {}", id, principal.subject),
            )
            .await;

        self.stores
            .users
            .update_user(&bound, &user)
            .await?
            .ok_or(ServiceError::NotFound("User"))
    }

    pub async fn delete(&self, ctx: &RequestContext, id: Uuid) -> ServiceResult<()> {
        let principal = ctx.authorize(&permissions::DELETE_USER)?;
        let (bound, user) = self.load_owned(ctx, id).await?;

        if user.email.eq_ignore_ascii_case(&principal.subject) {
            return Err(ServiceError::Rule("You cannot delete your own account".to_string()));
        }

        self.audit
            .record(
                ctx,
                AuditAction::DeleteUser,
                format!("User ID {} deleted by: {}", id, principal.subject),
            )
            .await;

        if !self.stores.users.delete_user(&bound, id).await? {
            return Err(ServiceError::NotFound("User"));
        }
        Ok(())
    }
}
