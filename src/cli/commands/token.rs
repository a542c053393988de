use anyhow::Context;
use serde_json::json;

use crate::auth::TokenVerifier;
use crate::cli::{utils::output_success, OutputFormat};
use crate::config::config;
use crate::tenancy::TenantId;
use crate::types::Role;

pub fn handle(sub: &str, role: Role, tenant: Option<&str>, output_format: OutputFormat) -> anyhow::Result<()> {
    let security = &config().security;
    let verifier = TokenVerifier::new(&security.jwt_secret, security.jwt_expiry_hours)?;

    let tenant = tenant
        .map(TenantId::new)
        .transpose()
        .context("invalid --tenant")?;
    if tenant.is_none() && role != Role::SuperAdmin {
        tracing::warn!("Minting a {} token without a tenant claim", role);
    }

    let token = verifier.issue(sub, tenant.as_ref(), role)?;
    output_success(
        output_format,
        "Token issued",
        Some(json!({
            "token": token,
            "expiresIn": verifier.expiry_seconds(),
        })),
    )
}
