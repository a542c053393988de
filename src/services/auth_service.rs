use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::audit::{AuditAction, AuditRecorder};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::TokenVerifier;
use crate::authz::{permissions, AuthzError};
use crate::database::models::{Tenant, User};
use crate::database::Stores;
use crate::tenancy::{RequestContext, TenantId};
use crate::types::{Plan, Role, TenantStatus};

use super::{normalized_email, required, strong_enough, ServiceError, ServiceResult};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub tenant_name: String,
    pub subdomain: String,
    pub admin_email: String,
    pub admin_password: String,
    pub admin_full_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub tenant_id: TenantId,
    pub subdomain: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Omitted for platform super admins, or when the request host already
    /// names the tenant.
    #[serde(default)]
    pub tenant_subdomain: Option<String>,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: i64,
    pub user: User,
}

#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    #[serde(flatten)]
    pub user: User,
    pub tenant: Option<Tenant>,
}

pub struct AuthService {
    stores: Stores,
    verifier: Arc<TokenVerifier>,
    audit: Arc<AuditRecorder>,
    reserved_subdomains: Vec<String>,
}

impl AuthService {
    pub fn new(
        stores: Stores,
        verifier: Arc<TokenVerifier>,
        audit: Arc<AuditRecorder>,
        reserved_subdomains: Vec<String>,
    ) -> Self {
        Self {
            stores,
            verifier,
            audit,
            reserved_subdomains,
        }
    }

    fn validate_subdomain(&self, raw: &str) -> ServiceResult<String> {
        let subdomain = required("subdomain", raw)?.to_ascii_lowercase();
        let well_formed = (3..=63).contains(&subdomain.len())
            && subdomain.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            && !subdomain.starts_with('-')
            && !subdomain.ends_with('-');
        if !well_formed {
            return Err(ServiceError::invalid(
                "subdomain",
                "must be 3-63 characters of letters, digits and inner hyphens",
            ));
        }
        if self.reserved_subdomains.iter().any(|r| r == &subdomain) {
            return Err(ServiceError::invalid("subdomain", "is reserved"));
        }
        Ok(subdomain)
    }

    /// Creates a tenant on the free plan together with its first tenant admin.
    pub async fn register(&self, _ctx: &RequestContext, request: RegisterRequest) -> ServiceResult<Registration> {
        let tenant_name = required("tenantName", &request.tenant_name)?;
        let subdomain = self.validate_subdomain(&request.subdomain)?;
        let email = normalized_email("adminEmail", &request.admin_email)?;
        let full_name = required("adminFullName", &request.admin_full_name)?;
        strong_enough("adminPassword", &request.admin_password)?;

        if self.stores.tenants.subdomain_exists(&subdomain).await? {
            return Err(ServiceError::Conflict("Subdomain already exists".to_string()));
        }

        let password_hash = hash_password(&request.admin_password)?;
        let tenant = Tenant::new(tenant_name, subdomain, Plan::Free);
        let admin = User::new(
            Some(tenant.id.clone()),
            email,
            password_hash,
            full_name,
            Role::TenantAdmin,
        );

        // Tagged with the new tenant, never with whatever the request host bound.
        self.audit
            .record_for(
                Some(tenant.id.clone()),
                Some(admin.email.clone()),
                AuditAction::TenantRegistration,
                format!("Registered tenant: {}", tenant.name),
            )
            .await;

        let (tenant, _admin) = self.stores.tenants.register_tenant(tenant, admin).await?;

        tracing::info!(tenant = %tenant.id, subdomain = %tenant.subdomain, "Tenant registered");
        Ok(Registration {
            tenant_id: tenant.id,
            subdomain: tenant.subdomain,
        })
    }

    pub async fn login(&self, ctx: &RequestContext, request: LoginRequest) -> ServiceResult<LoginResponse> {
        let tenant = match request.tenant_subdomain.as_deref().map(str::trim) {
            Some(subdomain) if !subdomain.is_empty() => Some(
                self.stores
                    .tenants
                    .find_by_subdomain(subdomain)
                    .await?
                    .ok_or_else(|| ServiceError::TenantNotFound(subdomain.to_string()))?,
            ),
            // fall back to the tenant the request host resolved to
            _ => match ctx.tenant_id() {
                Some(id) => self.stores.tenants.find_tenant(&id).await?,
                None => None,
            },
        };

        if let Some(tenant) = &tenant {
            if tenant.status == TenantStatus::Suspended {
                return Err(AuthzError::Denied("Organization is suspended").into());
            }
        }

        let tenant_id = tenant.as_ref().map(|t| &t.id);
        let user = self
            .stores
            .users
            .find_user_by_email(tenant_id, request.email.trim())
            .await?
            .ok_or(ServiceError::BadCredentials)?;

        if !user.is_active || !verify_password(&request.password, &user.password_hash) {
            tracing::warn!(email = %user.email, "Failed login attempt");
            return Err(ServiceError::BadCredentials);
        }

        let token = self.verifier.issue(&user.email, user.tenant_id.as_ref(), user.role)?;
        Ok(LoginResponse {
            token,
            expires_in: self.verifier.expiry_seconds(),
            user,
        })
    }

    pub async fn me(&self, ctx: &RequestContext) -> ServiceResult<Profile> {
        let principal = ctx.authorize(&permissions::VIEW_PROFILE)?;
        let user = self
            .stores
            .users
            .find_user_by_email(principal.tenant_id.as_ref(), &principal.subject)
            .await?
            .ok_or(ServiceError::NotFound("User"))?;

        let tenant = match &user.tenant_id {
            Some(id) => Some(
                self.stores
                    .tenants
                    .find_tenant(id)
                    .await?
                    .ok_or_else(|| ServiceError::TenantNotFound(id.to_string()))?,
            ),
            None => None,
        };

        Ok(Profile { user, tenant })
    }

    pub async fn logout(&self, ctx: &RequestContext) -> ServiceResult<()> {
        let principal = ctx.authorize(&permissions::LOGOUT)?;
        self.audit
            .record(
                ctx,
                AuditAction::UserLogout,
                format!("User {} logged out", principal.subject),
            )
            .await;
        Ok(())
    }
}
