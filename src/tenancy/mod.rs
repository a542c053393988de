// tenancy/mod.rs - Tenant resolution and isolation
//
// context  - per-request tenant binding and its clearing guard
// pipeline - ordered resolver stages and the axum middleware running them
// request  - RequestContext handed to services and its extractor

pub mod context;
pub mod pipeline;
pub mod request;

pub use context::{BindingSource, InvalidTenantId, TenantBinding, TenantContext, TenantId, TenantScope};
pub use pipeline::{resolve_tenant, BearerTokenStage, RequestHead, Resolution, ResolverStage, SubdomainStage, TenantResolver};
pub use request::RequestContext;
