use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Application-specific error types.
#[derive(Debug)]
pub enum AppError {
    /// Database-related errors.
    DatabaseError(sqlx::Error),
    /// Referenced resource (catalog course, enrollment) does not exist.
    NotFound(String),
    /// Bad request error (missing or unusable parameters).
    BadRequest(String),
    /// Malformed batch import payload.
    InvalidInput(String),
    /// Enrolling would push the period credit total over its cap.
    LimitExceeded {
        /// Credits already carried in the period.
        current_credits: i32,
        /// Credits of the course being enrolled.
        attempted_credits: i32,
        /// Cap that applied to the period.
        limit: i32,
    },
    /// Unique key already taken (e.g. duplicate catalog code).
    Conflict(String),
    /// Error talking to the dashboard API from the import tool.
    ExternalApiError(String),
    /// Internal server error.
    InternalError(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl AppError {
    /// Machine-readable kind reported in the JSON body.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::DatabaseError(_) => "database_error",
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::LimitExceeded { .. } => "limit_exceeded",
            AppError::Conflict(_) => "conflict",
            AppError::ExternalApiError(_) => "external_api_error",
            AppError::InternalError(_) => "internal_error",
            AppError::WithContext { source, .. } => source.kind(),
        }
    }
}

impl fmt::Display for AppError {
    /// Formats the error for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::DatabaseError(e) => write!(f, "Database error: {}", e),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AppError::LimitExceeded {
                current_credits,
                attempted_credits,
                limit,
            } => write!(
                f,
                "Credit limit exceeded: {} + {} > {}",
                current_credits, attempted_credits, limit
            ),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::ExternalApiError(msg) => write!(f, "External API error: {}", msg),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Converts the error into an HTTP response.
    ///
    /// Maps each error variant to an appropriate HTTP status code and JSON body.
    /// Every body carries `error` and `kind`; `LimitExceeded` adds the credit figures.
    fn into_response(self) -> Response {
        let kind = self.kind();
        let (status, error_message) = match &self {
            AppError::DatabaseError(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::LimitExceeded {
                current_credits,
                attempted_credits,
                limit,
            } => {
                tracing::info!(
                    "Enrollment rejected: {} + {} credits over limit {}",
                    current_credits,
                    attempted_credits,
                    limit
                );
                let body = Json(json!({
                    "error": "Credit limit exceeded",
                    "kind": kind,
                    "currentCredits": current_credits,
                    "attemptedCredits": attempted_credits,
                    "limit": limit,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::ExternalApiError(msg) => {
                tracing::error!("External API error: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "External service error".to_string(),
                )
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::WithContext { source, context } => {
                // Log full context chain for debugging
                tracing::error!("Error with context: {} -> {}", context, source);
                // Delegate to underlying error's response
                return source.clone().into_response();
            }
        };

        let body = Json(json!({
            "error": error_message,
            "kind": kind,
        }));

        (status, body).into_response()
    }
}

// Make AppError cloneable for WithContext variant
impl Clone for AppError {
    /// Clones the error.
    ///
    /// Note: `sqlx::Error` is not cloneable, so `DatabaseError` is simplified to `RowNotFound` during cloning.
    fn clone(&self) -> Self {
        match self {
            AppError::DatabaseError(_e) => AppError::DatabaseError(sqlx::Error::RowNotFound), // Simplified clone
            AppError::NotFound(msg) => AppError::NotFound(msg.clone()),
            AppError::BadRequest(msg) => AppError::BadRequest(msg.clone()),
            AppError::InvalidInput(msg) => AppError::InvalidInput(msg.clone()),
            AppError::LimitExceeded {
                current_credits,
                attempted_credits,
                limit,
            } => AppError::LimitExceeded {
                current_credits: *current_credits,
                attempted_credits: *attempted_credits,
                limit: *limit,
            },
            AppError::Conflict(msg) => AppError::Conflict(msg.clone()),
            AppError::ExternalApiError(msg) => AppError::ExternalApiError(msg.clone()),
            AppError::InternalError(msg) => AppError::InternalError(msg.clone()),
            AppError::WithContext { source, context } => AppError::WithContext {
                source: source.clone(),
                context: context.clone(),
            },
        }
    }
}

impl From<sqlx::Error> for AppError {
    /// Converts a `sqlx::Error` into an `AppError`.
    ///
    /// Unique-key violations become `Conflict`; everything else stays a database error.
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                return AppError::Conflict(db_err.message().to_string());
            }
        }
        AppError::DatabaseError(err)
    }
}

impl From<reqwest::Error> for AppError {
    /// Converts a `reqwest::Error` into an `AppError`.
    fn from(err: reqwest::Error) -> Self {
        AppError::ExternalApiError(err.to_string())
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    ///
    /// # Arguments
    ///
    /// * `context` - The context message to add.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    ///
    /// # Arguments
    ///
    /// * `f` - A closure that produces the context message.
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}

/// Extension for sqlx::Error to add context
impl<T> ResultExt<T> for Result<T, sqlx::Error> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(AppError::from(e)),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(AppError::from(e)),
            context: f(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn limit_exceeded_carries_credit_figures() {
        let (status, body) = body_json(AppError::LimitExceeded {
            current_credits: 28,
            attempted_credits: 6,
            limit: 32,
        })
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Credit limit exceeded");
        assert_eq!(body["kind"], "limit_exceeded");
        assert_eq!(body["currentCredits"], 28);
        assert_eq!(body["attemptedCredits"], 6);
        assert_eq!(body["limit"], 32);
    }

    #[tokio::test]
    async fn context_keeps_underlying_status() {
        let err: Result<(), AppError> = Err(AppError::NotFound("Course not found".to_string()));
        let err = err.context("enrolling").unwrap_err();
        assert_eq!(err.kind(), "not_found");
        assert!(err.to_string().starts_with("enrolling: Not found"));

        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Course not found");
    }

    #[test]
    fn test_error_display() {
        let error = AppError::InvalidInput("Records must be an array".to_string());
        assert_eq!(error.to_string(), "Invalid input: Records must be an array");
    }
}
