pub mod password;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::tenancy::TenantId;
use crate::types::Role;

/// Token claims. `tenant_id` is absent only for platform super admins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("invalid credential: {0}")]
    InvalidCredential(String),
    #[error("token signing secret is not configured")]
    MissingSecret,
    #[error("token generation failed: {0}")]
    TokenGeneration(String),
    #[error("token lifetime of {0} hours is out of range")]
    InvalidExpiry(u64),
}

/// Output of a successful verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedCredential {
    pub subject: String,
    pub tenant_id: Option<TenantId>,
    pub role: Role,
}

/// Authenticated caller attached to a request by the bearer-token stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub subject: String,
    pub role: Role,
    pub tenant_id: Option<TenantId>,
}

impl Principal {
    pub fn is_super_admin(&self) -> bool {
        self.role == Role::SuperAdmin
    }
}

impl From<VerifiedCredential> for Principal {
    fn from(credential: VerifiedCredential) -> Self {
        Self {
            subject: credential.subject,
            role: credential.role,
            tenant_id: credential.tenant_id,
        }
    }
}

/// HS256 token issuer and verifier.
pub struct TokenVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

impl TokenVerifier {
    pub fn new(secret: &str, expiry_hours: u64) -> Result<Self, CredentialError> {
        if secret.is_empty() {
            return Err(CredentialError::MissingSecret);
        }

        let lifetime = i64::try_from(expiry_hours)
            .ok()
            .and_then(Duration::try_hours)
            .filter(|lifetime| Utc::now().checked_add_signed(*lifetime).is_some())
            .ok_or(CredentialError::InvalidExpiry(expiry_hours))?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            lifetime,
        })
    }

    pub fn expiry_seconds(&self) -> i64 {
        self.lifetime.num_seconds()
    }

    /// Verifies signature, expiry and the required claims of `token`.
    ///
    /// Untrusted input is fine here: every decode or claim problem comes back
    /// as `CredentialError::InvalidCredential`.
    pub fn verify(&self, token: &str) -> Result<VerifiedCredential, CredentialError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            let reason = match e.kind() {
                ErrorKind::ExpiredSignature => "token expired".to_string(),
                ErrorKind::InvalidSignature => "signature mismatch".to_string(),
                _ => format!("malformed token: {}", e),
            };
            CredentialError::InvalidCredential(reason)
        })?;

        Self::credential_from_claims(data.claims)
    }

    fn credential_from_claims(claims: Claims) -> Result<VerifiedCredential, CredentialError> {
        if claims.sub.trim().is_empty() {
            return Err(CredentialError::InvalidCredential("missing subject".into()));
        }

        let role: Role = claims
            .role
            .parse()
            .map_err(|e: crate::types::ParseEnumError| CredentialError::InvalidCredential(e.to_string()))?;

        let tenant_id = match claims.tenant_id {
            Some(id) => Some(
                TenantId::new(id)
                    .map_err(|_| CredentialError::InvalidCredential("empty tenant_id claim".into()))?,
            ),
            None => None,
        };

        if tenant_id.is_none() && role != Role::SuperAdmin {
            return Err(CredentialError::InvalidCredential(
                "missing tenant_id claim".into(),
            ));
        }

        Ok(VerifiedCredential {
            subject: claims.sub,
            tenant_id,
            role,
        })
    }

    /// Mints a token for a freshly authenticated user.
    pub fn issue(
        &self,
        subject: &str,
        tenant_id: Option<&TenantId>,
        role: Role,
    ) -> Result<String, CredentialError> {
        let now = Utc::now();
        let expires = now
            .checked_add_signed(self.lifetime)
            .ok_or_else(|| CredentialError::TokenGeneration("expiry out of range".into()))?;
        let claims = Claims {
            sub: subject.to_string(),
            tenant_id: tenant_id.map(|id| id.to_string()),
            role: role.as_str().to_string(),
            exp: expires.timestamp(),
            iat: now.timestamp(),
        };
        self.sign(&claims)
    }

    pub fn sign(&self, claims: &Claims) -> Result<String, CredentialError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| CredentialError::TokenGeneration(e.to_string()))
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let token = header_value
        .strip_prefix("Bearer ")
        .or_else(|| header_value.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> TokenVerifier {
        TokenVerifier::new("unit-test-secret", 1).unwrap()
    }

    fn claims(role: &str, tenant: Option<&str>, exp_offset_secs: i64) -> Claims {
        let now = Utc::now().timestamp();
        Claims {
            sub: "alice@acme.test".into(),
            tenant_id: tenant.map(str::to_string),
            role: role.into(),
            exp: now + exp_offset_secs,
            iat: now,
        }
    }

    fn is_invalid(result: Result<VerifiedCredential, CredentialError>) -> bool {
        matches!(result, Err(CredentialError::InvalidCredential(_)))
    }

    #[test]
    fn issued_token_verifies() {
        let v = verifier();
        let tenant = TenantId::new("t-1").unwrap();
        let token = v.issue("alice@acme.test", Some(&tenant), Role::TenantAdmin).unwrap();

        let credential = v.verify(&token).unwrap();
        assert_eq!(credential.subject, "alice@acme.test");
        assert_eq!(credential.tenant_id, Some(tenant));
        assert_eq!(credential.role, Role::TenantAdmin);
    }

    #[test]
    fn super_admin_needs_no_tenant() {
        let v = verifier();
        let token = v.issue("root@system.test", None, Role::SuperAdmin).unwrap();
        let credential = v.verify(&token).unwrap();
        assert_eq!(credential.tenant_id, None);
    }

    #[test]
    fn tenant_roles_require_tenant_claim() {
        let v = verifier();
        let token = v.sign(&claims("user", None, 600)).unwrap();
        assert!(is_invalid(v.verify(&token)));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let v = verifier();
        let token = v.sign(&claims("user", Some("t-1"), -3600)).unwrap();
        match v.verify(&token) {
            Err(CredentialError::InvalidCredential(reason)) => assert_eq!(reason, "token expired"),
            other => panic!("expected expiry failure, got {:?}", other),
        }
    }

    #[test]
    fn foreign_signatures_are_rejected() {
        let other = TokenVerifier::new("someone-else", 1).unwrap();
        let token = other.sign(&claims("user", Some("t-1"), 600)).unwrap();
        assert!(is_invalid(verifier().verify(&token)));
    }

    #[test]
    fn unknown_roles_are_rejected() {
        let v = verifier();
        let token = v.sign(&claims("owner", Some("t-1"), 600)).unwrap();
        assert!(is_invalid(v.verify(&token)));
    }

    #[test]
    fn garbage_never_panics() {
        let v = verifier();
        for input in ["", ".", "a.b.c", "not-a-jwt", "eyJhbGciOiJIUzI1NiJ9..", "\u{0}\u{1}"] {
            assert!(is_invalid(v.verify(input)), "input {:?} should be invalid", input);
        }
    }

    #[test]
    fn empty_secret_is_refused() {
        assert!(matches!(
            TokenVerifier::new("", 1),
            Err(CredentialError::MissingSecret)
        ));
    }

    #[test]
    fn out_of_range_lifetime_is_refused() {
        for hours in [u64::MAX, i64::MAX as u64, 10_000_000_000] {
            assert!(matches!(
                TokenVerifier::new("unit-test-secret", hours),
                Err(CredentialError::InvalidExpiry(h)) if h == hours
            ));
        }

        let v = TokenVerifier::new("unit-test-secret", 24 * 365).unwrap();
        assert_eq!(v.expiry_seconds(), 365 * 24 * 3600);
        assert!(v.issue("alice@acme.test", None, Role::SuperAdmin).is_ok());
    }

    #[test]
    fn bearer_prefix_is_required() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("Bearer   "), None);
        assert_eq!(bearer_token("Basic abc"), None);
    }
}
