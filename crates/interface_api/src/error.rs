//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use domain_ledger::{LedgerError, StoreError};

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (error_type, message) = match &self {
            ApiError::NotFound(msg) => ("not_found", msg.clone()),
            ApiError::Conflict(msg) => ("conflict", msg.clone()),
            ApiError::Validation(msg) => ("validation_error", msg.clone()),
            ApiError::Database(msg) => ("database_error", msg.clone()),
            ApiError::Internal(msg) => ("internal_error", msg.clone()),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
        };

        (self.status(), Json(body)).into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Store(StoreError::Backend(msg))
            | LedgerError::Store(StoreError::TransactionFailed(msg)) => {
                tracing::error!(error = %msg, "Ledger storage failure");
                ApiError::Database(msg)
            }
            e if e.is_validation() => ApiError::Validation(e.to_string()),
            e if e.is_not_found() => ApiError::NotFound(e.to_string()),
            e if e.is_conflict() => ApiError::Conflict(e.to_string()),
            e => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        LedgerError::Store(err).into()
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::Validation(errors.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_batch_validation_maps_to_unprocessable() {
        let err: ApiError = LedgerError::UnbalancedBatch {
            debit: Decimal::new(500, 0),
            credit: Decimal::new(499, 0),
            difference: Decimal::ONE,
        }
        .into();

        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(err.to_string().contains("Difference: 1.00"));
    }

    #[test]
    fn test_ledger_errors_map_to_status() {
        let missing: ApiError = LedgerError::BatchNotFound("JV-ADJ-1".into()).into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let reversed: ApiError = LedgerError::AlreadyReversed("JV-ADJ-1".into()).into();
        assert_eq!(reversed.status(), StatusCode::CONFLICT);

        let conflict: ApiError = StoreError::Conflict("duplicate code".into()).into();
        assert_eq!(conflict.status(), StatusCode::CONFLICT);

        let backend: ApiError = StoreError::Backend("connection reset".into()).into();
        assert!(matches!(backend, ApiError::Database(_)));
    }
}
