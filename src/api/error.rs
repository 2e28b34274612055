use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;

use crate::domain::order::{CommandError, OrderError};
use crate::domain::user::UserError;
use crate::persistence::RepositoryError;

// ============================================================================
// API Errors - mapping onto HTTP status codes
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    PreconditionFailed(String),

    #[error("{0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
    cause: Option<&'a str>,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PreconditionFailed(_) => StatusCode::PRECONDITION_FAILED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            ApiError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(ErrorBody {
            message: &message,
            cause: None,
        })
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(_) => ApiError::NotFound(err.to_string()),
            RepositoryError::VersionConflict { .. } | RepositoryError::Constraint(_) => {
                ApiError::Conflict(err.to_string())
            }
            RepositoryError::Corrupt(_) | RepositoryError::Database(_) => {
                tracing::error!(error = %err, "Repository failure");
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        ApiError::Conflict(err.to_string())
    }
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<CommandError> for ApiError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::NotFound(_) => ApiError::NotFound(err.to_string()),
            CommandError::PreconditionFailed { .. } => ApiError::PreconditionFailed(err.to_string()),
            CommandError::Domain(e) => e.into(),
            CommandError::Repository(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{OrderCommand, OrderStatus};
    use uuid::Uuid;

    #[test]
    fn test_status_codes() {
        let invalid: ApiError = CommandError::Domain(OrderError::InvalidTransition {
            command: OrderCommand::MarkTaken,
            required: OrderStatus::Ready,
            actual: OrderStatus::Paid,
        })
        .into();
        assert_eq!(invalid.status_code(), StatusCode::CONFLICT);

        let missing: ApiError = CommandError::NotFound(Uuid::now_v7()).into();
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);

        let stale: ApiError = RepositoryError::VersionConflict { expected: 1, actual: 2 }.into();
        assert_eq!(stale.status_code(), StatusCode::CONFLICT);

        let precondition: ApiError = CommandError::PreconditionFailed {
            order_id: Uuid::now_v7(),
            expected: 0,
            actual: 1,
        }
        .into();
        assert_eq!(precondition.status_code(), StatusCode::PRECONDITION_FAILED);

        let bad: ApiError = UserError::EmptyUsername.into();
        assert_eq!(bad.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_internal_errors_are_not_leaked() {
        let err = ApiError::Internal("connection refused to 10.0.0.3".to_string());
        let response = err.error_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
