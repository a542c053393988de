// services - Business operations behind the HTTP handlers
//
// Every operation takes the RequestContext explicitly, runs the
// authorization gate first, and scopes persistence calls with the bound
// tenant. Mutations record their audit entry after the business checks and
// before the write.

pub mod audit_service;
pub mod auth_service;
pub mod project_service;
pub mod task_service;
pub mod tenant_service;
pub mod user_service;

use std::sync::Arc;

use crate::audit::AuditRecorder;
use crate::auth::password::PasswordError;
use crate::auth::{CredentialError, TokenVerifier};
use crate::authz::AuthzError;
use crate::database::manager::DatabaseError;
use crate::database::Stores;
use crate::quota::{QuotaEnforcer, QuotaError};

pub use audit_service::AuditLogService;
pub use auth_service::AuthService;
pub use project_service::ProjectService;
pub use task_service::TaskService;
pub use tenant_service::TenantService;
pub use user_service::UserService;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Authz(#[from] AuthzError),
    #[error(transparent)]
    Quota(#[from] QuotaError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error("Tenant not found: {0}")]
    TenantNotFound(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("{field}: {problem}")]
    Invalid { field: &'static str, problem: String },
    #[error("Invalid credentials")]
    BadCredentials,
    #[error("{0}")]
    Rule(String),
}

impl ServiceError {
    pub fn invalid(field: &'static str, problem: impl Into<String>) -> Self {
        ServiceError::Invalid {
            field,
            problem: problem.into(),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Trimmed, non-empty text field.
pub(crate) fn required(field: &'static str, value: &str) -> ServiceResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ServiceError::invalid(field, "must not be empty"));
    }
    Ok(value.to_string())
}

/// Minimal shape check; deliverability is not our concern.
pub(crate) fn normalized_email(field: &'static str, value: &str) -> ServiceResult<String> {
    let value = required(field, value)?.to_ascii_lowercase();
    match value.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(value),
        _ => Err(ServiceError::invalid(field, "must be a valid email address")),
    }
}

pub(crate) fn strong_enough(field: &'static str, password: &str) -> ServiceResult<()> {
    if password.chars().count() < 8 {
        return Err(ServiceError::invalid(field, "must be at least 8 characters"));
    }
    Ok(())
}

/// One instance of every service, sharing the same collaborators.
pub struct Services {
    pub auth: AuthService,
    pub tenants: TenantService,
    pub users: UserService,
    pub projects: ProjectService,
    pub tasks: TaskService,
    pub audit_log: AuditLogService,
}

impl Services {
    pub fn new(
        stores: &Stores,
        verifier: Arc<TokenVerifier>,
        quota: Arc<QuotaEnforcer>,
        audit: Arc<AuditRecorder>,
        reserved_subdomains: Vec<String>,
    ) -> Self {
        Self {
            auth: AuthService::new(stores.clone(), verifier, audit.clone(), reserved_subdomains),
            tenants: TenantService::new(stores.clone(), audit.clone()),
            users: UserService::new(stores.clone(), quota.clone(), audit.clone()),
            projects: ProjectService::new(stores.clone(), quota, audit.clone()),
            tasks: TaskService::new(stores.clone(), audit),
            audit_log: AuditLogService::new(stores.audit.clone()),
        }
    }
}
