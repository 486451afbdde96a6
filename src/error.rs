//! Unified error types for the backend.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use crate::schemas::ErrorResponse;

/// Unified error type returned by services and handlers.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Persistence error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Authentication or authorization error.
    #[error("{0}")]
    Auth(#[from] AuthError),

    /// Outbound mail error.
    #[error("mail error: {0}")]
    Mail(#[from] MailError),

    /// Request payload failed validation.
    #[error("{0}")]
    Validation(String),

    /// Request is well formed but cannot be honoured.
    #[error("{0}")]
    BadRequest(String),

    /// Entity does not exist (or is not visible to the caller).
    #[error("{0}")]
    NotFound(String),

    /// Caller is authenticated but not allowed.
    #[error("{0}")]
    Forbidden(String),

    /// Request conflicts with existing state.
    #[error("{0}")]
    Conflict(String),
}

/// Persistence errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Driver or connection error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// A unique constraint rejected the write.
    #[error("unique constraint violated: {constraint}")]
    UniqueViolation {
        /// Name of the violated constraint.
        constraint: String,
    },

    /// A foreign key rejected the write or delete.
    #[error("foreign key constraint violated: {constraint}")]
    ForeignKeyViolation {
        /// Name of the violated constraint.
        constraint: String,
    },

    /// JSON column could not be (de)serialized.
    #[error("json column error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    /// Classify a driver error, lifting constraint violations out of it.
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            let constraint = db.constraint().unwrap_or("unknown").to_string();
            if db.is_unique_violation() {
                return StoreError::UniqueViolation { constraint };
            }
            if db.is_foreign_key_violation() {
                return StoreError::ForeignKeyViolation { constraint };
            }
        }
        StoreError::Database(err)
    }
}

/// Authentication and authorization errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown email or wrong password.
    #[error("incorrect email or password")]
    InvalidCredentials,

    /// No bearer token on the request.
    #[error("missing bearer token")]
    MissingToken,

    /// Token could not be decoded or verified.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// Token signature is valid but it has expired.
    #[error("token has expired")]
    TokenExpired,

    /// Token subject no longer exists.
    #[error("user not found")]
    UserNotFound,

    /// Refresh token unknown, revoked or expired.
    #[error("invalid or expired refresh token")]
    InvalidRefreshToken,

    /// Password reset token unknown, used or expired.
    #[error("invalid or expired reset token")]
    InvalidResetToken,

    /// Tenant scoped endpoint called without an active tenant.
    #[error("User has no current tenant set")]
    NoActiveTenant,

    /// Caller is not a member of the tenant.
    #[error("user is not a member of this tenant")]
    NotTenantMember,

    /// Caller lacks the admin role in the tenant.
    #[error("admin role required")]
    AdminRequired,

    /// Webhook signature missing or wrong.
    #[error("invalid webhook signature")]
    InvalidSignature,

    /// Password hashing backend failed.
    #[error("password hashing failed: {0}")]
    Hashing(String),

    /// Token could not be signed.
    #[error("token signing failed: {0}")]
    Signing(String),
}

impl AuthError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials
            | AuthError::MissingToken
            | AuthError::InvalidToken(_)
            | AuthError::TokenExpired
            | AuthError::UserNotFound
            | AuthError::InvalidRefreshToken => StatusCode::UNAUTHORIZED,
            AuthError::InvalidResetToken | AuthError::NoActiveTenant => StatusCode::BAD_REQUEST,
            AuthError::NotTenantMember | AuthError::AdminRequired | AuthError::InvalidSignature => {
                StatusCode::FORBIDDEN
            }
            AuthError::Hashing(_) | AuthError::Signing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Outbound mail errors.
#[derive(Error, Debug)]
pub enum MailError {
    /// The transport refused or failed to deliver the message.
    #[error("delivery to {recipient} failed: {reason}")]
    Delivery {
        /// Recipient address.
        recipient: String,
        /// Transport specific reason.
        reason: String,
    },
}

impl AppError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Auth(e) => e.status_code(),
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Store(StoreError::UniqueViolation { .. }) => StatusCode::CONFLICT,
            AppError::Store(StoreError::ForeignKeyViolation { .. }) => StatusCode::CONFLICT,
            AppError::Config(_) | AppError::Store(_) | AppError::Mail(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Short machine readable code placed in the `error` field.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Auth(AuthError::NoActiveTenant) => "no_active_tenant",
            AppError::Auth(e) if e.status_code() == StatusCode::FORBIDDEN => "forbidden",
            AppError::Auth(e) if e.status_code() == StatusCode::BAD_REQUEST => "bad_request",
            AppError::Auth(e) if e.status_code() == StatusCode::UNAUTHORIZED => "unauthorized",
            AppError::Validation(_) => "validation_error",
            AppError::BadRequest(_) => "bad_request",
            AppError::NotFound(_) => "not_found",
            AppError::Forbidden(_) => "forbidden",
            AppError::Conflict(_)
            | AppError::Store(StoreError::UniqueViolation { .. })
            | AppError::Store(StoreError::ForeignKeyViolation { .. }) => "conflict",
            _ => "internal_error",
        }
    }

    /// Message safe to show to API clients.
    fn public_message(&self) -> String {
        match self.status_code() {
            StatusCode::INTERNAL_SERVER_ERROR => "Internal server error".to_string(),
            StatusCode::CONFLICT if matches!(self, AppError::Store(_)) => {
                "Resource conflicts with existing data".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }

        let body = ErrorResponse {
            message: self.public_message(),
            status_code: status.as_u16(),
            error: Some(self.code().to_string()),
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(e) => AppError::Validation(e.body_text()),
            JsonRejection::JsonSyntaxError(e) => AppError::BadRequest(e.body_text()),
            JsonRejection::MissingJsonContentType(_) => {
                AppError::BadRequest("Expected request with `Content-Type: application/json`".to_string())
            }
            other => AppError::BadRequest(other.body_text()),
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, AppError>;

/// Result type of the persistence layer.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
