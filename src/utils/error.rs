use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

use crate::store::StoreError;
use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Free plan event limit reached")]
    QuotaExceeded,

    #[error("Custom theme colors require a Pro plan")]
    FeatureLocked,

    #[error("You are already registered for this event")]
    AlreadyRegistered,

    #[error("This event is sold out")]
    EventFull,

    #[error("This event has already ended")]
    EventEnded,

    #[error("This ticket has been cancelled")]
    AlreadyCancelled,

    #[error("The request conflicted with concurrent updates, please retry")]
    Conflict,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::QuotaExceeded => StatusCode::FORBIDDEN,
            AppError::FeatureLocked => StatusCode::FORBIDDEN,
            AppError::AlreadyRegistered => StatusCode::CONFLICT,
            AppError::EventFull => StatusCode::CONFLICT,
            AppError::EventEnded => StatusCode::GONE,
            AppError::AlreadyCancelled => StatusCode::GONE,
            AppError::Conflict => StatusCode::CONFLICT,
        }
    }

    /// Stable machine code; the UI branches on these (upgrade modal on
    /// `QUOTA_EXCEEDED`/`FEATURE_LOCKED`, sold-out banner on `EVENT_FULL`).
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::AuthError(_) => "AUTH_ERROR",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::QuotaExceeded => "QUOTA_EXCEEDED",
            AppError::FeatureLocked => "FEATURE_LOCKED",
            AppError::AlreadyRegistered => "ALREADY_REGISTERED",
            AppError::EventFull => "EVENT_FULL",
            AppError::EventEnded => "EVENT_ENDED",
            AppError::AlreadyCancelled => "ALREADY_CANCELLED",
            AppError::Conflict => "CONFLICT",
        }
    }

    fn log(&self) {
        match self {
            // Exhausted retries point at real contention problems.
            AppError::Conflict => error!(error = ?self, "commit retries exhausted"),
            _ => warn!(code = self.code(), message = %self, "request rejected"),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::EventNotFound => AppError::NotFound("Event not found".to_string()),
            StoreError::RegistrationNotFound => {
                AppError::NotFound("Registration not found".to_string())
            }
            StoreError::EventFull => AppError::EventFull,
            StoreError::EventEnded => AppError::EventEnded,
            StoreError::AlreadyRegistered => AppError::AlreadyRegistered,
            StoreError::QuotaExceeded => AppError::QuotaExceeded,
            StoreError::Conflict => AppError::Conflict,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        self.log();

        error_response(code, self.to_string(), None, status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_rejection_has_a_distinct_code() {
        let errors = [
            AppError::ValidationError("x".into()),
            AppError::AuthError("x".into()),
            AppError::Forbidden("x".into()),
            AppError::NotFound("x".into()),
            AppError::QuotaExceeded,
            AppError::FeatureLocked,
            AppError::AlreadyRegistered,
            AppError::EventFull,
            AppError::EventEnded,
            AppError::AlreadyCancelled,
            AppError::Conflict,
        ];
        let mut codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn store_errors_map_onto_the_taxonomy() {
        assert!(matches!(
            AppError::from(StoreError::EventFull),
            AppError::EventFull
        ));
        assert!(matches!(
            AppError::from(StoreError::QuotaExceeded),
            AppError::QuotaExceeded
        ));
        assert!(matches!(
            AppError::from(StoreError::EventNotFound),
            AppError::NotFound(_)
        ));
    }
}
