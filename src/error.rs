use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email address has not been verified")]
    NotVerified,

    #[error("Account is blocked")]
    AccountBlocked,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Security answer does not match")]
    SecurityAnswerMismatch,

    #[error("User not found")]
    UserNotFound,

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("Admin privileges required")]
    Forbidden,

    /// Database or mail provider unreachable. The payload is logged, never returned.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::DuplicateEmail => "duplicate_email",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::NotVerified => "not_verified",
            AppError::AccountBlocked => "account_blocked",
            AppError::InvalidToken => "invalid_token",
            AppError::SecurityAnswerMismatch => "security_answer_mismatch",
            AppError::UserNotFound => "user_not_found",
            AppError::NotFound(_) => "not_found",
            AppError::Unauthenticated(_) => "unauthenticated",
            AppError::Forbidden => "forbidden",
            AppError::UpstreamUnavailable(_) => "upstream_unavailable",
            AppError::Internal(_) => "internal_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidToken => StatusCode::BAD_REQUEST,
            AppError::DuplicateEmail => StatusCode::CONFLICT,
            AppError::InvalidCredentials
            | AppError::SecurityAnswerMismatch
            | AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::NotVerified | AppError::AccountBlocked | AppError::Forbidden => {
                StatusCode::FORBIDDEN
            }
            AppError::UserNotFound | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> String {
        match self {
            AppError::UpstreamUnavailable(_) => {
                "Service temporarily unavailable, please retry later".to_string()
            }
            AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::UpstreamUnavailable(detail) => {
                error!(error = %detail, "upstream unavailable");
            }
            AppError::Internal(detail) => {
                error!(error = %detail, "internal error");
            }
            _ => {}
        }

        let body = Json(json!({
            "success": false,
            "error": self.code(),
            "message": self.public_message(),
        }));
        (self.status_code(), body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => AppError::UpstreamUnavailable(e.to_string()),
            _ => AppError::Internal(e.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}
