// tenancy/context.rs - Per-request tenant binding
//
// A TenantContext is created empty for each request by the resolution
// pipeline, handed down the call chain inside RequestContext, and cleared by
// a TenantScope guard when the request future completes or is dropped.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Opaque tenant identifier. Never empty; "no tenant" is `Option::None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("tenant identifier must not be empty")]
pub struct InvalidTenantId;

impl TenantId {
    pub fn new(id: impl Into<String>) -> Result<Self, InvalidTenantId> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(InvalidTenantId);
        }
        Ok(Self(id))
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TenantId {
    type Error = InvalidTenantId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TenantId> for String {
    fn from(id: TenantId) -> Self {
        id.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a binding came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingSource {
    Token,
    Subdomain,
}

/// Resolution state of a request's tenant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TenantBinding {
    #[default]
    Unresolved,
    BoundByToken(TenantId),
    BoundBySubdomain(TenantId),
}

impl TenantBinding {
    pub fn bound(tenant_id: TenantId, source: BindingSource) -> Self {
        match source {
            BindingSource::Token => TenantBinding::BoundByToken(tenant_id),
            BindingSource::Subdomain => TenantBinding::BoundBySubdomain(tenant_id),
        }
    }

    pub fn tenant_id(&self) -> Option<&TenantId> {
        match self {
            TenantBinding::Unresolved => None,
            TenantBinding::BoundByToken(id) | TenantBinding::BoundBySubdomain(id) => Some(id),
        }
    }

    pub fn source(&self) -> Option<BindingSource> {
        match self {
            TenantBinding::Unresolved => None,
            TenantBinding::BoundByToken(_) => Some(BindingSource::Token),
            TenantBinding::BoundBySubdomain(_) => Some(BindingSource::Subdomain),
        }
    }

    pub fn is_bound(&self) -> bool {
        !matches!(self, TenantBinding::Unresolved)
    }
}

/// Handle to one request's tenant binding.
///
/// Clones share the same binding, so the pipeline and the handlers of a
/// single request see the same value. A fresh context is allocated per
/// request; nothing is stored per thread or per worker.
#[derive(Debug, Clone, Default)]
pub struct TenantContext {
    binding: Arc<RwLock<TenantBinding>>,
}

impl TenantContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds the request to `tenant_id`, replacing any earlier binding.
    pub fn bind(&self, tenant_id: TenantId, source: BindingSource) {
        *self.write() = TenantBinding::bound(tenant_id, source);
    }

    pub fn current(&self) -> Option<TenantId> {
        self.read().tenant_id().cloned()
    }

    pub fn binding(&self) -> TenantBinding {
        self.read().clone()
    }

    pub fn clear(&self) {
        *self.write() = TenantBinding::Unresolved;
    }

    /// Returns a guard that clears this context when dropped.
    pub fn scope(&self) -> TenantScope {
        TenantScope {
            context: self.clone(),
        }
    }

    pub(crate) fn set_binding(&self, binding: TenantBinding) {
        *self.write() = binding;
    }

    // A poisoned lock only means a panic happened mid-request; the binding
    // itself is a plain value and still valid to read or reset.
    fn read(&self) -> RwLockReadGuard<'_, TenantBinding> {
        self.binding.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, TenantBinding> {
        self.binding.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Clears the owning [`TenantContext`] on drop, whichever way the request ends.
#[must_use = "the tenant binding is cleared as soon as the scope is dropped"]
#[derive(Debug)]
pub struct TenantScope {
    context: TenantContext,
}

impl Drop for TenantScope {
    fn drop(&mut self) {
        self.context.clear();
        tracing::trace!("tenant context cleared");
    }
}
