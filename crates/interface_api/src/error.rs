//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use core_kernel::PortError;
use domain_proposal::ProposalError;
use domain_rating::RatingError;

use crate::auth::AuthError;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Validation error: {0}")]
    Validation(String, Vec<String>),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into(), Vec::new())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Validation(..) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error_type, message, details) = match self {
            ApiError::NotFound(msg) => ("not_found", msg, None),
            ApiError::BadRequest(msg) => ("bad_request", msg, None),
            ApiError::Unauthorized => ("unauthorized", "Unauthorized".to_string(), None),
            ApiError::Forbidden(msg) => ("forbidden", msg, None),
            ApiError::Conflict(msg) => ("conflict", msg, None),
            ApiError::Unavailable(msg) => ("service_unavailable", msg, None),
            ApiError::Internal(msg) => {
                error!(error = %msg, "internal error");
                ("internal_error", "Internal server error".to_string(), None)
            }
            ApiError::Validation(msg, details) => (
                "validation_error",
                msg,
                (!details.is_empty()).then_some(details),
            ),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<PortError> for ApiError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            PortError::Validation { message } => ApiError::validation(message),
            PortError::Conflict { message } => ApiError::Conflict(message),
            ref e if e.is_transient() => ApiError::Unavailable(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<RatingError> for ApiError {
    fn from(err: RatingError) -> Self {
        match err {
            RatingError::Validation(message) => ApiError::validation(message),
            RatingError::Financial(e) => ApiError::validation(e.to_string()),
            RatingError::VersionLocked(_) | RatingError::NotCurrentVersion(_) => {
                ApiError::Conflict(err.to_string())
            }
            RatingError::Store(e) => e.into(),
            ref e if e.is_ineligible() => ApiError::NotFound(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ProposalError> for ApiError {
    fn from(err: ProposalError) -> Self {
        match err {
            ProposalError::NotFound(_) => ApiError::NotFound(err.to_string()),
            ProposalError::InvalidTransition { .. } => ApiError::Conflict(err.to_string()),
            ProposalError::Validation(message) => ApiError::validation(message),
            ProposalError::Dependency { .. } => ApiError::Unavailable(err.to_string()),
            ProposalError::Financial(e) => ApiError::validation(e.to_string()),
            ProposalError::Template(message) => ApiError::Internal(message),
            ProposalError::Rating(e) => e.into(),
            ProposalError::Store(e) => e.into(),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| match &e.message {
                    Some(message) => format!("{}: {}", field, message),
                    None => format!("{}: {}", field, e.code),
                })
            })
            .collect();
        details.sort();
        ApiError::Validation("Request validation failed".to_string(), details)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingPermission(_) => ApiError::Forbidden(err.to_string()),
            AuthError::InvalidToken | AuthError::TokenExpired | AuthError::InvalidSubject => {
                ApiError::Unauthorized
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_proposal::{ProposalOperation, ProposalStatus};

    #[test]
    fn test_port_error_status() {
        assert_eq!(
            ApiError::from(PortError::not_found("Proposal", "PRP-1")).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(PortError::conflict("version clash")).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(PortError::unavailable("catalogue")).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::from(PortError::Timeout {
                operation: "send_email".to_string(),
                duration_ms: 5000,
            }).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_rating_error_status() {
        assert_eq!(
            ApiError::from(RatingError::validation("origin is required")).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::from(RatingError::VersionLocked("QRQ-1".to_string())).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(RatingError::Store(PortError::unavailable("catalogue"))).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_proposal_error_status() {
        let invalid = ProposalError::InvalidTransition {
            operation: ProposalOperation::Approve,
            from: ProposalStatus::Completed,
        };
        assert_eq!(ApiError::from(invalid).status(), StatusCode::CONFLICT);

        let dependency = ProposalError::dependency(
            "queue rejection email",
            "PRP-1",
            &PortError::unavailable("job worker"),
        );
        assert_eq!(ApiError::from(dependency).status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_auth_error_status() {
        assert_eq!(
            ApiError::from(AuthError::MissingPermission("approve proposals".to_string())).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(ApiError::from(AuthError::TokenExpired).status(), StatusCode::UNAUTHORIZED);
    }
}
