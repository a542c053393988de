use std::sync::Arc;

use crate::audit::AuditRecorder;
use crate::auth::{CredentialError, TokenVerifier};
use crate::config::AppConfig;
use crate::database::Stores;
use crate::quota::QuotaEnforcer;
use crate::services::Services;
use crate::tenancy::TenantResolver;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub resolver: Arc<TenantResolver>,
    pub stores: Stores,
    pub services: Arc<Services>,
}

impl AppState {
    /// Wires the pipeline and services over `stores`. Fails when no signing
    /// secret is configured or the token lifetime is out of range.
    pub fn new(config: AppConfig, stores: Stores) -> Result<Self, CredentialError> {
        let verifier = Arc::new(TokenVerifier::new(
            &config.security.jwt_secret,
            config.security.jwt_expiry_hours,
        )?);
        let reserved = config.tenancy.reserved_subdomains.clone();

        let resolver = Arc::new(TenantResolver::standard(
            verifier.clone(),
            stores.tenants.clone(),
            reserved.clone(),
        ));
        let quota = Arc::new(QuotaEnforcer::new());
        let audit = Arc::new(AuditRecorder::new(
            stores.audit.clone(),
            config.security.enable_audit_logging,
        ));
        let services = Arc::new(Services::new(
            &stores,
            verifier,
            quota,
            audit,
            reserved,
        ));

        Ok(Self {
            config: Arc::new(config),
            resolver,
            stores,
            services,
        })
    }
}
