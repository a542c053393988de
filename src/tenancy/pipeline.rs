// tenancy/pipeline.rs - Tenant resolution pipeline
//
// Stage order is fixed: bearer token first, subdomain fallback second. The
// subdomain stage never touches a request the token stage already bound.
// The middleware clears the context through a TenantScope guard, so the
// binding is gone whether the handler returns, errors, or panics.

use axum::{
    async_trait,
    extract::{Request, State},
    http::{header, HeaderMap, Uri},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::auth::{self, Principal, TokenVerifier};
use crate::database::store::TenantStore;

use super::context::{TenantBinding, TenantContext, TenantId};
use super::request::RequestContext;

/// Advisory tenant header. Never used as a binding source.
pub const TENANT_HEADER: &str = "x-tenant-id";

/// Borrowed view of the parts of a request the stages look at.
#[derive(Debug, Clone, Copy)]
pub struct RequestHead<'a> {
    pub headers: &'a HeaderMap,
    pub uri: &'a Uri,
}

impl<'a> RequestHead<'a> {
    pub fn new(headers: &'a HeaderMap, uri: &'a Uri) -> Self {
        Self { headers, uri }
    }

    fn header(&self, name: impl header::AsHeaderName) -> Option<&'a str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Host without port, lower-cased. Falls back to the URI authority.
    pub fn host(&self) -> Option<String> {
        let raw = self.header(header::HOST).or_else(|| self.uri.host())?;
        let host = match raw.rsplit_once(':') {
            Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
            _ => raw,
        };
        let host = host.trim().trim_end_matches('.');
        if host.is_empty() {
            None
        } else {
            Some(host.to_ascii_lowercase())
        }
    }
}

/// Accumulated result of the stages run so far.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub binding: TenantBinding,
    pub principal: Option<Principal>,
}

#[async_trait]
pub trait ResolverStage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn resolve(&self, head: &RequestHead<'_>, resolution: Resolution) -> Resolution;
}

/// Stage 1: derive tenant and principal from a verified bearer token.
pub struct BearerTokenStage {
    verifier: Arc<TokenVerifier>,
}

impl BearerTokenStage {
    pub fn new(verifier: Arc<TokenVerifier>) -> Self {
        Self { verifier }
    }
}

#[async_trait]
impl ResolverStage for BearerTokenStage {
    fn name(&self) -> &'static str {
        "bearer_token"
    }

    async fn resolve(&self, head: &RequestHead<'_>, mut resolution: Resolution) -> Resolution {
        let Some(token) = head.header(header::AUTHORIZATION).and_then(auth::bearer_token) else {
            return resolution;
        };

        let credential = match self.verifier.verify(token) {
            Ok(credential) => credential,
            Err(e) => {
                // Unauthenticated endpoints must stay reachable
                tracing::warn!("Bearer token rejected, continuing unauthenticated: {}", e);
                return resolution;
            }
        };

        if let Some(claimed) = head.header(TENANT_HEADER) {
            let matches = credential.tenant_id.as_ref().map(TenantId::as_str) == Some(claimed);
            if !matches {
                tracing::warn!(
                    subject = %credential.subject,
                    header_tenant = %claimed,
                    "Ignoring X-Tenant-ID that disagrees with the verified token"
                );
            }
        }

        if let Some(tenant_id) = credential.tenant_id.clone() {
            tracing::debug!(tenant = %tenant_id, "Tenant bound from bearer token");
            resolution.binding = TenantBinding::BoundByToken(tenant_id);
        }
        resolution.principal = Some(Principal::from(credential));
        resolution
    }
}

/// Stage 2: for still-unbound requests, map the host's first label to a tenant.
pub struct SubdomainStage {
    tenants: Arc<dyn TenantStore>,
    reserved: Vec<String>,
}

impl SubdomainStage {
    pub fn new(tenants: Arc<dyn TenantStore>, reserved: Vec<String>) -> Self {
        let reserved = reserved.into_iter().map(|s| s.to_ascii_lowercase()).collect();
        Self { tenants, reserved }
    }

    /// Candidate subdomain of `host`, if it has one and it is not reserved.
    pub fn candidate(&self, host: &str) -> Option<String> {
        let (label, _) = host.split_once('.')?;
        if label.is_empty() || self.reserved.iter().any(|r| r == label) {
            return None;
        }
        Some(label.to_string())
    }
}

#[async_trait]
impl ResolverStage for SubdomainStage {
    fn name(&self) -> &'static str {
        "subdomain"
    }

    async fn resolve(&self, head: &RequestHead<'_>, mut resolution: Resolution) -> Resolution {
        if resolution.binding.is_bound() {
            return resolution;
        }
        let Some(subdomain) = head.host().and_then(|host| self.candidate(&host)) else {
            return resolution;
        };

        match self.tenants.find_by_subdomain(&subdomain).await {
            Ok(Some(tenant)) => {
                tracing::debug!(tenant = %tenant.id, subdomain = %subdomain, "Tenant bound from subdomain");
                resolution.binding = TenantBinding::BoundBySubdomain(tenant.id);
            }
            Ok(None) => {
                tracing::debug!(subdomain = %subdomain, "Subdomain does not match a tenant");
            }
            Err(e) => {
                tracing::warn!(subdomain = %subdomain, "Subdomain lookup failed: {}", e);
            }
        }
        resolution
    }
}

/// Ordered chain of resolver stages.
#[derive(Clone)]
pub struct TenantResolver {
    stages: Vec<Arc<dyn ResolverStage>>,
}

impl TenantResolver {
    pub fn new(stages: Vec<Arc<dyn ResolverStage>>) -> Self {
        Self { stages }
    }

    /// Token stage followed by subdomain fallback.
    pub fn standard(
        verifier: Arc<TokenVerifier>,
        tenants: Arc<dyn TenantStore>,
        reserved_subdomains: Vec<String>,
    ) -> Self {
        Self::new(vec![
            Arc::new(BearerTokenStage::new(verifier)),
            Arc::new(SubdomainStage::new(tenants, reserved_subdomains)),
        ])
    }

    pub async fn resolve(&self, head: &RequestHead<'_>) -> Resolution {
        let mut resolution = Resolution::default();
        for stage in &self.stages {
            resolution = stage.resolve(head, resolution).await;
            tracing::trace!(stage = stage.name(), binding = ?resolution.binding, "Resolver stage done");
        }
        resolution
    }
}

/// Middleware running the resolver and scoping the tenant binding to the
/// lifetime of the downstream call.
pub async fn resolve_tenant(
    State(resolver): State<Arc<TenantResolver>>,
    mut request: Request,
    next: Next,
) -> Response {
    let resolution = {
        let head = RequestHead::new(request.headers(), request.uri());
        resolver.resolve(&head).await
    };

    let tenant = TenantContext::new();
    let _scope = tenant.scope();
    tenant.set_binding(resolution.binding);

    request
        .extensions_mut()
        .insert(RequestContext::new(tenant, resolution.principal));

    next.run(request).await
}
