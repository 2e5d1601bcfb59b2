use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Access denied")]
    Forbidden,

    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Uniqueness violation (duplicate employee code, duplicate member/date cell).
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("External service unavailable: {0}")]
    ServiceUnavailable(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl AppError {
    /// Classify a database error: unique-constraint violations become `Conflict`,
    /// a missing row becomes `NotFound`, both carrying `message`.
    pub fn from_db(err: sqlx::Error, message: &str) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict(message.to_string())
            }
            sqlx::Error::RowNotFound => AppError::NotFound(message.to_string()),
            _ => AppError::Database(err),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, AppError::Conflict(_))
    }

    /// Stable machine-readable code, shared by HTTP responses and batch results.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Forbidden => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::RateLimited => "RATE_LIMITED",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Jwt(_) => "INVALID_TOKEN",
            AppError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message that is safe to show to the client.
    pub fn public_message(&self) -> String {
        match self {
            AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::Validation(msg)
            | AppError::ServiceUnavailable(msg) => msg.clone(),
            AppError::Unauthorized | AppError::Forbidden | AppError::RateLimited => {
                self.to_string()
            }
            AppError::Database(_) => "A database error occurred".to_string(),
            AppError::Jwt(_) => "Invalid or expired token".to_string(),
            AppError::Internal(_) => "An internal error occurred".to_string(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized | AppError::Jwt(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl AppError {
    /// Render the error envelope with a `details` object attached.
    pub fn into_response_with_details(self, details: Option<serde_json::Value>) -> Response {
        match &self {
            AppError::Database(e) => tracing::error!("Database error: {:?}", e),
            AppError::Jwt(e) => tracing::warn!("JWT error: {:?}", e),
            AppError::Internal(e) => tracing::error!("Internal error: {:?}", e),
            _ => {}
        }

        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code().to_string(),
                message: self.public_message(),
                details,
            },
        };

        (self.status(), Json(body)).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.into_response_with_details(None)
    }
}

pub type AppResult<T> = Result<T, AppError>;
