// authz.rs - Role-based authorization gate
//
// Every protected operation declares the exact set of roles it accepts.
// There is no role inheritance: super_admin passes a check only when the
// operation lists it.

use crate::auth::Principal;
use crate::tenancy::TenantId;
use crate::types::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Any principal with a recognized role.
    Authenticated,
    AnyOf(&'static [Role]),
}

impl Requirement {
    pub fn permits(&self, role: Role) -> bool {
        match self {
            Requirement::Authenticated => true,
            Requirement::AnyOf(roles) => roles.contains(&role),
        }
    }
}

/// A named protected operation and the roles allowed to invoke it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permission {
    pub action: &'static str,
    pub requirement: Requirement,
}

impl Permission {
    pub const fn any_of(action: &'static str, roles: &'static [Role]) -> Self {
        Self {
            action,
            requirement: Requirement::AnyOf(roles),
        }
    }

    pub const fn authenticated(action: &'static str) -> Self {
        Self {
            action,
            requirement: Requirement::Authenticated,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    #[error("Authentication required")]
    Unauthenticated,
    #[error("Access denied: role '{role}' may not {action}")]
    RoleNotAllowed { role: Role, action: &'static str },
    #[error("Access denied: resource belongs to another organization")]
    CrossTenant,
    #[error("No organization is bound to this request")]
    NoTenant,
    #[error("{0}")]
    Denied(&'static str),
}

/// Evaluates `permission` for the caller. Fails closed when there is no principal.
pub fn authorize<'a>(
    principal: Option<&'a Principal>,
    permission: &Permission,
) -> Result<&'a Principal, AuthzError> {
    let principal = principal.ok_or(AuthzError::Unauthenticated)?;
    if permission.requirement.permits(principal.role) {
        Ok(principal)
    } else {
        tracing::warn!(
            subject = %principal.subject,
            role = %principal.role,
            action = permission.action,
            "Authorization denied"
        );
        Err(AuthzError::RoleNotAllowed {
            role: principal.role,
            action: permission.action,
        })
    }
}

/// Explicit ownership predicate: the resource's tenant must equal the bound tenant.
pub fn ensure_same_tenant(resource_tenant: &TenantId, bound: Option<&TenantId>) -> Result<(), AuthzError> {
    match bound {
        Some(bound) if bound == resource_tenant => Ok(()),
        _ => {
            tracing::warn!(
                resource_tenant = %resource_tenant,
                bound_tenant = ?bound.map(TenantId::as_str),
                "Cross-tenant access attempt blocked"
            );
            Err(AuthzError::CrossTenant)
        }
    }
}

/// Declared role sets, one per protected operation.
pub mod permissions {
    use super::Permission;
    use crate::types::Role::{SuperAdmin, TenantAdmin, TenantUser};

    pub const VIEW_PROFILE: Permission = Permission::authenticated("view own profile");
    pub const LOGOUT: Permission = Permission::authenticated("log out");

    pub const LIST_TENANTS: Permission = Permission::any_of("list all tenants", &[SuperAdmin]);
    pub const VIEW_TENANT: Permission = Permission::any_of("view tenant details", &[SuperAdmin, TenantAdmin]);
    pub const UPDATE_TENANT: Permission = Permission::any_of("update tenant", &[SuperAdmin, TenantAdmin]);
    pub const CHANGE_PLAN: Permission = Permission::any_of("change subscription plan", &[SuperAdmin]);

    pub const LIST_USERS: Permission = Permission::any_of("list users", &[TenantAdmin, TenantUser]);
    pub const CREATE_USER: Permission = Permission::any_of("create users", &[TenantAdmin]);
    pub const UPDATE_USER: Permission = Permission::any_of("update users", &[TenantAdmin, TenantUser]);
    pub const DELETE_USER: Permission = Permission::any_of("delete users", &[TenantAdmin]);

    pub const LIST_PROJECTS: Permission = Permission::authenticated("list projects");
    pub const CREATE_PROJECT: Permission = Permission::any_of("create projects", &[TenantAdmin, TenantUser]);
    pub const VIEW_PROJECT: Permission = Permission::any_of("view projects", &[TenantAdmin, TenantUser]);
    pub const UPDATE_PROJECT: Permission = Permission::any_of("update projects", &[TenantAdmin, TenantUser]);
    pub const DELETE_PROJECT: Permission = Permission::any_of("delete projects", &[TenantAdmin, TenantUser]);

    pub const LIST_TASKS: Permission = Permission::authenticated("list tasks");
    pub const MANAGE_TASKS: Permission = Permission::any_of("manage tasks", &[TenantAdmin, TenantUser]);

    pub const VIEW_AUDIT_LOG: Permission = Permission::any_of("view audit logs", &[TenantAdmin]);
}
