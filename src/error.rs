use amal_core::SyncGroup;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errors surfaced to API callers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn not_found(what: &str) -> Self {
        AppError::NotFound(format!("{} not found", what))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match &self {
            AppError::Store(e) => {
                tracing::error!(error = %e, "store failure");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (self.status(), Json(json!({ "error": message }))).into_response()
    }
}

/// One sync group failed; its transaction was rolled back.
#[derive(Debug, Error)]
#[error("failed to sync {group}")]
pub struct ReconcileError {
    pub group: SyncGroup,
    #[source]
    pub source: sqlx::Error,
}

impl ReconcileError {
    pub fn new(group: SyncGroup, source: sqlx::Error) -> Self {
        Self { group, source }
    }

    /// Message safe to hand back to the client.
    /// Store errors keep their details in the logs.
    pub fn public_message(&self) -> String {
        match self.source {
            sqlx::Error::RowNotFound => format!("{} not found", self.group),
            _ => self.to_string(),
        }
    }
}

impl From<ReconcileError> for AppError {
    fn from(err: ReconcileError) -> Self {
        AppError::Store(err.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::validation("bad").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::Unauthorized("no".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AppError::not_found("profile").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::from(sqlx::Error::PoolClosed).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_not_found_message() {
        assert_eq!(AppError::not_found("profile").to_string(), "profile not found");
    }

    #[test]
    fn test_reconcile_error_messages() {
        let missing = ReconcileError::new(SyncGroup::Profile, sqlx::Error::RowNotFound);
        assert_eq!(missing.public_message(), "profile not found");

        let failed = ReconcileError::new(SyncGroup::Achievements, sqlx::Error::PoolClosed);
        assert_eq!(failed.public_message(), "failed to sync achievements");
    }
}
