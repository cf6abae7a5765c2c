/// Error Handling Module
///
/// One error type per concern, unified under `AppError` for control flow.
/// `AppError` knows how to turn itself into an HTTP response: every token or
/// header failure collapses into the same "Unauthorized" body and login
/// failures into the same "Incorrect email or password" body. The precise
/// variant is only ever written to the log.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

// ============================================================================
// 1. DOMAIN-SPECIFIC ERROR TYPES
// ============================================================================

/// Authentication and token errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown handle or wrong password. Never split for the client.
    CredentialInvalid,
    TokenExpired,
    /// Bad signature, malformed structure, or unparseable subject.
    TokenInvalid,
    TokenNotFound,
    TokenRevoked,
    HeaderMissing,
    MalformedHeader,
    /// Hashing infrastructure fault (empty input, corrupt stored hash).
    Hashing(String),
}

impl AuthError {
    /// True for every failure that must surface as a bare 401.
    pub fn is_unauthorized(&self) -> bool {
        !matches!(self, AuthError::Hashing(_))
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::CredentialInvalid => write!(f, "Invalid credentials"),
            AuthError::TokenExpired => write!(f, "Token has expired"),
            AuthError::TokenInvalid => write!(f, "Invalid token"),
            AuthError::TokenNotFound => write!(f, "Token not found"),
            AuthError::TokenRevoked => write!(f, "Token has been revoked"),
            AuthError::HeaderMissing => write!(f, "Missing authorization header"),
            AuthError::MalformedHeader => write!(f, "Malformed authorization header"),
            AuthError::Hashing(msg) => write!(f, "Password hashing failed: {}", msg),
        }
    }
}

impl StdError for AuthError {}

/// Persistence errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    NotFound,
    UniqueViolation(String),
    Connection(String),
    Query(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound => write!(f, "Record not found"),
            StoreError::UniqueViolation(msg) => write!(f, "Duplicate entry: {}", msg),
            StoreError::Connection(msg) => write!(f, "Database connection error: {}", msg),
            StoreError::Query(msg) => write!(f, "Query error: {}", msg),
        }
    }
}

impl StdError for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
                StoreError::UniqueViolation(db_err.message().to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Connection(err.to_string())
            }
            _ => StoreError::Query(err.to_string()),
        }
    }
}

/// Request payload errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyField(String),
    OutOfRange(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{} is empty", field),
            ValidationError::OutOfRange(field) => write!(f, "{} is out of range", field),
        }
    }
}

impl StdError for ValidationError {}

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError {
    MissingRequired(String),
    InvalidValue(String),
    ParseError(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingRequired(msg) => write!(f, "Missing required config: {}", msg),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid config value: {}", msg),
            ConfigError::ParseError(msg) => write!(f, "Config parse error: {}", msg),
        }
    }
}

impl StdError for ConfigError {}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

// ============================================================================
// 2. UNIFIED APPLICATION ERROR TYPE
// ============================================================================

#[derive(Debug)]
pub enum AppError {
    Auth(AuthError),
    Store(StoreError),
    Validation(ValidationError),
    Config(ConfigError),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Auth(e) => write!(f, "{}", e),
            AppError::Store(e) => write!(f, "{}", e),
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Config(e) => write!(f, "{}", e),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Store(err)
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

// ============================================================================
// 3. HTTP RESPONSE MAPPING
// ============================================================================

/// Error body returned to clients
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Correlates the response with the log line
    pub error_id: String,
    pub message: String,
    pub code: String,
    pub status: u16,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Trait for converting errors to HTTP responses with proper logging
pub trait ErrorHandler {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse);
    fn log_error(&self, request_id: &str);
}

impl ErrorHandler for AppError {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse) {
        let (status, code, message) = match self {
            AppError::Auth(AuthError::CredentialInvalid) => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "Incorrect email or password",
            ),
            AppError::Auth(AuthError::Hashing(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error",
            ),
            AppError::Auth(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "Unauthorized"),

            AppError::Store(StoreError::Connection(_)) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                "Database service temporarily unavailable",
            ),
            AppError::Store(StoreError::UniqueViolation(_)) => (
                StatusCode::CONFLICT,
                "DUPLICATE_ENTRY",
                "Email already registered",
            ),
            AppError::Store(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "Database error occurred",
            ),

            AppError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                "Invalid request",
            ),

            AppError::Config(_) | AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error",
            ),
        };

        let message = match self {
            AppError::Validation(e) => e.to_string(),
            _ => message.to_string(),
        };

        let error_response =
            ErrorResponse::new(request_id.to_string(), message, code.to_string(), status.as_u16());

        (status, error_response)
    }

    fn log_error(&self, request_id: &str) {
        match self {
            AppError::Auth(AuthError::Hashing(msg)) => {
                tracing::error!(request_id = request_id, error = %msg, "Password hashing fault");
            }
            AppError::Auth(AuthError::CredentialInvalid) => {
                tracing::warn!(request_id = request_id, "Invalid credentials attempt");
            }
            AppError::Auth(e) => {
                tracing::warn!(request_id = request_id, reason = %e, "Request not authorized");
            }
            AppError::Store(StoreError::UniqueViolation(msg)) => {
                tracing::warn!(request_id = request_id, error = %msg, "Duplicate entry attempt");
            }
            AppError::Store(e) => {
                tracing::error!(request_id = request_id, error = %e, "Database error");
            }
            AppError::Validation(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Validation error");
            }
            AppError::Config(e) => {
                tracing::error!(request_id = request_id, error = %e, "Configuration error");
            }
            AppError::Internal(msg) => {
                tracing::error!(request_id = request_id, error = %msg, "Internal error");
            }
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.log_error(&request_id);

        let (status, error_response) = <Self as ErrorHandler>::error_response(self, &request_id);

        HttpResponse::build(status).json(error_response)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Auth(e) if e.is_unauthorized() => StatusCode::UNAUTHORIZED,
            AppError::Auth(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Store(StoreError::Connection(_)) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Store(StoreError::UniqueViolation(_)) => StatusCode::CONFLICT,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Config(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_of(err: AppError) -> (StatusCode, ErrorResponse) {
        <AppError as ErrorHandler>::error_response(&err, "test-123")
    }

    #[test]
    fn test_token_errors_share_one_response() {
        let variants = vec![
            AuthError::TokenExpired,
            AuthError::TokenInvalid,
            AuthError::TokenNotFound,
            AuthError::TokenRevoked,
            AuthError::HeaderMissing,
            AuthError::MalformedHeader,
        ];

        for variant in variants {
            let (status, body) = body_of(AppError::Auth(variant.clone()));
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{:?}", variant);
            assert_eq!(body.code, "UNAUTHORIZED");
            assert_eq!(body.message, "Unauthorized");
        }
    }

    #[test]
    fn test_credential_invalid_message_is_uniform() {
        let (status, body) = body_of(AppError::Auth(AuthError::CredentialInvalid));

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body.message, "Incorrect email or password");
    }

    #[test]
    fn test_hashing_fault_is_server_error() {
        let err = AppError::Auth(AuthError::Hashing("corrupt".to_string()));
        assert_eq!(ResponseError::status_code(&err), StatusCode::INTERNAL_SERVER_ERROR);

        let (_, body) = body_of(err);
        assert!(!body.message.contains("corrupt"));
    }

    #[test]
    fn test_config_error_lifts_into_app_error() {
        let err: AppError = ConfigError::InvalidValue("auth.secret".to_string()).into();
        assert!(matches!(err, AppError::Config(_)));
        assert_eq!(ResponseError::status_code(&err), StatusCode::INTERNAL_SERVER_ERROR);

        let (status, body) = body_of(err);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.message.contains("auth.secret"));
    }

    #[test]
    fn test_duplicate_handle_is_conflict() {
        let err = AppError::Store(StoreError::UniqueViolation("users_email_key".to_string()));
        assert_eq!(ResponseError::status_code(&err), StatusCode::CONFLICT);

        let (_, body) = body_of(err);
        assert_eq!(body.code, "DUPLICATE_ENTRY");
        assert!(!body.message.contains("users_email_key"));
    }

    #[test]
    fn test_sqlx_row_not_found_maps_to_not_found() {
        let err: StoreError = sqlx::Error::RowNotFound.into();
        assert_eq!(err, StoreError::NotFound);
    }

    #[test]
    fn test_error_response_creation() {
        let response = ErrorResponse::new(
            "test-123".to_string(),
            "Test error".to_string(),
            "TEST_ERROR".to_string(),
            400,
        );

        assert_eq!(response.error_id, "test-123");
        assert_eq!(response.code, "TEST_ERROR");
        assert_eq!(response.status, 400);
    }
}
