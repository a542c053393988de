use std::sync::Arc;

use crate::audit::AuditRecorder;
use crate::auth::password::hash_password;
use crate::auth::{Principal, TokenVerifier};
use crate::database::models::{Tenant, User};
use crate::database::Stores;
use crate::quota::QuotaEnforcer;
use crate::services::Services;
use crate::tenancy::{BindingSource, RequestContext, TenantContext};
use crate::types::{Plan, Role};

pub const TEST_PASSWORD: &str = "Test@1234";

/// In-memory stores plus the full service set, for service-level tests.
pub struct TestContext {
    pub stores: Stores,
    pub verifier: Arc<TokenVerifier>,
    pub quota: Arc<QuotaEnforcer>,
    pub services: Services,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_stores(Stores::in_memory())
    }

    pub fn with_stores(stores: Stores) -> Self {
        let verifier = Arc::new(TokenVerifier::new("test-secret", 1).unwrap());
        let quota = Arc::new(QuotaEnforcer::new());
        let audit = Arc::new(AuditRecorder::new(stores.audit.clone(), true));
        let services = Services::new(
            &stores,
            verifier.clone(),
            quota.clone(),
            audit,
            vec!["www".to_string(), "localhost".to_string()],
        );
        Self {
            stores,
            verifier,
            quota,
            services,
        }
    }

    pub async fn create_tenant(&self, subdomain: &str, plan: Plan) -> Tenant {
        self.stores
            .tenants
            .insert_tenant(Tenant::new(format!("Tenant {subdomain}"), subdomain, plan))
            .await
            .unwrap()
    }

    pub async fn create_user(&self, tenant: &Tenant, email: &str, role: Role) -> User {
        let hash = hash_password(TEST_PASSWORD).unwrap();
        self.stores
            .users
            .insert_user(User::new(Some(tenant.id.clone()), email, hash, email, role))
            .await
            .unwrap()
    }

    /// Context as the pipeline would build it for a verified token.
    pub fn request_as(&self, tenant: Option<&Tenant>, email: &str, role: Role) -> RequestContext {
        let context = TenantContext::new();
        if let Some(tenant) = tenant {
            context.bind(tenant.id.clone(), BindingSource::Token);
        }
        let principal = Principal {
            subject: email.to_string(),
            role,
            tenant_id: tenant.map(|t| t.id.clone()),
        };
        RequestContext::new(context, Some(principal))
    }

    pub fn anonymous(&self) -> RequestContext {
        RequestContext::new(TenantContext::new(), None)
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
