//! Service error types with HTTP status code mapping.
//!
//! [`CareError`] is the central error type. Each variant maps to a numeric
//! code, an HTTP status and an [`ErrorCategory`], and renders as a
//! structured JSON body.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{NotificationId, UserId};

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2001,
///     "message": "time slot is not available or already booked"
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see [`CareError::error_code`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Coarse classification used by callers deciding whether to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rejected before any transaction started.
    Validation,
    /// Rejected inside the reservation transaction, after rollback.
    Conflict,
    /// Missing resource or insufficient access.
    Access,
    /// Datastore or internal fault; safe to retry.
    Infrastructure,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category       | HTTP Status               |
/// |-----------|----------------|---------------------------|
/// | 1000–1999 | Validation     | 400 Bad Request           |
/// | 2000–2999 | Conflict       | 400 Bad Request           |
/// | 4000–4999 | Access         | 401 / 403 / 404           |
/// | 3000–3999 | Infrastructure | 500 Internal Server Error |
#[derive(Debug, thiserror::Error)]
pub enum CareError {
    /// The doctor id does not resolve to a user with the doctor role.
    #[error("invalid doctor: {0}")]
    InvalidDoctor(UserId),

    /// The requested instant lies before the caller's clock.
    #[error("cannot book appointments in the past")]
    PastSlotRequested,

    /// Malformed or semantically invalid request input.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No free slot matched, or the lock could not be acquired in time.
    #[error("time slot is not available or already booked")]
    SlotUnavailable,

    /// The student already holds an appointment at the same instant.
    #[error("you already have an appointment at this time")]
    DuplicateStudentBooking,

    /// Doctor lookup for a read endpoint failed.
    #[error("doctor not found: {0}")]
    DoctorNotFound(UserId),

    /// Notification does not exist or belongs to another user.
    #[error("notification not found: {0}")]
    NotificationNotFound(NotificationId),

    /// The request carried no usable caller identity.
    #[error("authentication required")]
    Unauthenticated,

    /// The caller's role does not permit the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Datastore failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CareError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::InvalidDoctor(_) => 1002,
            Self::PastSlotRequested => 1003,
            Self::SlotUnavailable => 2001,
            Self::DuplicateStudentBooking => 2002,
            Self::Unauthenticated => 4001,
            Self::Forbidden(_) => 4003,
            Self::DoctorNotFound(_) => 4041,
            Self::NotificationNotFound(_) => 4042,
            Self::Internal(_) => 3000,
            Self::Persistence(_) => 3001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_)
            | Self::InvalidDoctor(_)
            | Self::PastSlotRequested
            | Self::SlotUnavailable
            | Self::DuplicateStudentBooking => StatusCode::BAD_REQUEST,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::DoctorNotFound(_) | Self::NotificationNotFound(_) => StatusCode::NOT_FOUND,
            Self::Persistence(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the category of this variant.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidRequest(_) | Self::InvalidDoctor(_) | Self::PastSlotRequested => {
                ErrorCategory::Validation
            }
            Self::SlotUnavailable | Self::DuplicateStudentBooking => ErrorCategory::Conflict,
            Self::Unauthenticated
            | Self::Forbidden(_)
            | Self::DoctorNotFound(_)
            | Self::NotificationNotFound(_) => ErrorCategory::Access,
            Self::Persistence(_) | Self::Internal(_) => ErrorCategory::Infrastructure,
        }
    }
}

impl From<sqlx::Error> for CareError {
    fn from(err: sqlx::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl From<JsonRejection> for CareError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for CareError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl From<PathRejection> for CareError {
    fn from(rejection: PathRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl IntoResponse for CareError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_rule_errors_are_bad_requests() {
        for err in [
            CareError::InvalidDoctor(UserId::new(1)),
            CareError::PastSlotRequested,
            CareError::SlotUnavailable,
            CareError::DuplicateStudentBooking,
        ] {
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST, "{err}");
        }
    }

    #[test]
    fn datastore_faults_are_server_errors() {
        let err = CareError::Persistence("connection reset".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.category(), ErrorCategory::Infrastructure);
    }

    #[test]
    fn categories_split_validation_from_conflict() {
        assert_eq!(
            CareError::PastSlotRequested.category(),
            ErrorCategory::Validation
        );
        assert_eq!(CareError::SlotUnavailable.category(), ErrorCategory::Conflict);
        assert_eq!(
            CareError::DuplicateStudentBooking.category(),
            ErrorCategory::Conflict
        );
    }

    #[test]
    fn response_carries_status_and_code() {
        let response = CareError::NotificationNotFound(NotificationId::new(9)).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
