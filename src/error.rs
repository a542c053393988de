// HTTP API Error Types
use axum::{response::IntoResponse, http::StatusCode, Json};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::auth::CredentialError;
use crate::authz::AuthzError;
use crate::database::manager::DatabaseError;
use crate::quota::QuotaError;
use crate::services::ServiceError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 422 Unprocessable Entity: plan ceiling reached
    QuotaExceeded(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::ValidationError { .. } => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::QuotaExceeded(_) => 422,
            ApiError::InternalServerError(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::QuotaExceeded(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        match self {
            ApiError::ValidationError { message, field_errors } => {
                let mut response = json!({
                    "success": false,
                    "error": message,
                    "code": "VALIDATION_ERROR"
                });

                if let Some(field_errors) = field_errors {
                    response["field_errors"] = json!(field_errors);
                }

                response
            }
            _ => {
                json!({
                    "success": false,
                    "error": self.message(),
                    "code": self.error_code()
                })
            }
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::QuotaExceeded(_) => "QUOTA_EXCEEDED",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(
        message: impl Into<String>,
        field_errors: Option<HashMap<String, String>>,
    ) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors,
        }
    }

    /// Single-field validation failure
    pub fn invalid_field(field: &str, problem: impl Into<String>) -> Self {
        let mut field_errors = HashMap::new();
        field_errors.insert(field.to_string(), problem.into());
        ApiError::validation_error("Invalid request", Some(field_errors))
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Convert other error types to ApiError
impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::Unauthenticated => ApiError::unauthorized(err.to_string()),
            AuthzError::NoTenant => ApiError::forbidden(err.to_string()),
            AuthzError::RoleNotAllowed { .. } | AuthzError::CrossTenant | AuthzError::Denied(_) => {
                ApiError::forbidden(err.to_string())
            }
        }
    }
}

impl From<QuotaError> for ApiError {
    fn from(err: QuotaError) -> Self {
        ApiError::QuotaExceeded(err.to_string())
    }
}

impl From<CredentialError> for ApiError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::InvalidCredential(_) => ApiError::unauthorized("Invalid or expired token"),
            CredentialError::MissingSecret
            | CredentialError::InvalidExpiry(_)
            | CredentialError::TokenGeneration(_) => {
                tracing::error!("Token signing failed: {}", err);
                ApiError::internal_server_error("Could not issue token")
            }
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Conflict(msg) => ApiError::conflict(msg),
            DatabaseError::Unavailable(_) | DatabaseError::ConfigMissing(_) => {
                tracing::error!("Database unavailable: {}", err);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            DatabaseError::Migration(e) => {
                tracing::error!("Migration error: {}", e);
                ApiError::service_unavailable("Service is being updated, please try again later")
            }
            DatabaseError::CorruptRow(msg) => {
                tracing::error!("Corrupt row: {}", msg);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            DatabaseError::Sqlx(sqlx_err) => {
                // Log the real error but return generic message
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal_server_error("Database error occurred")
            }
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Authz(e) => e.into(),
            ServiceError::Quota(e) => e.into(),
            ServiceError::Database(e) => e.into(),
            ServiceError::Credential(e) => e.into(),
            ServiceError::Password(e) => {
                tracing::error!("Password hashing failed: {}", e);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            ServiceError::TenantNotFound(_) | ServiceError::NotFound(_) => ApiError::not_found(err.to_string()),
            ServiceError::Conflict(msg) => ApiError::conflict(msg),
            ServiceError::Invalid { field, problem } => ApiError::invalid_field(field, problem),
            ServiceError::BadCredentials => ApiError::unauthorized(err.to_string()),
            ServiceError::Rule(msg) => ApiError::bad_request(msg),
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Plan, ResourceKind, Role};

    #[test]
    fn test_authz_errors_map_to_401_and_403() {
        assert_eq!(ApiError::from(AuthzError::Unauthenticated).status_code(), 401);
        let denied = AuthzError::RoleNotAllowed {
            role: Role::TenantUser,
            action: "create users",
        };
        assert_eq!(ApiError::from(denied).status_code(), 403);
        assert_eq!(ApiError::from(AuthzError::CrossTenant).status_code(), 403);
    }

    #[test]
    fn test_quota_error_is_a_business_error() {
        let err = ApiError::from(QuotaError::Exceeded {
            kind: ResourceKind::Project,
            plan: Plan::Free,
            limit: 3,
        });
        assert_eq!(err.status_code(), 422);
        assert_eq!(err.error_code(), "QUOTA_EXCEEDED");
        assert!(err.message().contains("Project limit reached"));
    }

    #[test]
    fn test_sql_detail_is_not_exposed() {
        let err = ApiError::from(DatabaseError::Sqlx(sqlx::Error::PoolTimedOut));
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.message(), "Database error occurred");
    }
}
