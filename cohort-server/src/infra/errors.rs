use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use cohort_core::{
    CoreError,
    domain::{
        admission::AdmissionError,
        enrollment::{OrderError, VerificationError},
        progress::ProgressError,
    },
};
use serde_json::json;
use std::fmt;

pub type AppResult<T> = Result<T, AppError>;

/// Message shown for faults the caller cannot act on. Details go to the log.
const RETRY_LATER: &str = "Something went wrong on our side, please retry later";

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
    /// Stable machine-readable discriminator for clients.
    pub code: &'static str,
}

impl AppError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            message: message.into(),
            code,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal", message)
    }

    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "Forbidden", message)
    }

    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, code, message)
    }

    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, code, message)
    }

    pub fn unprocessable(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, code, message)
    }

    pub fn unavailable(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, code, message)
    }

    fn storage(err: CoreError) -> Self {
        tracing::error!(error = %err, "storage operation failed");
        Self::internal(RETRY_LATER)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "message": self.message,
                "status": self.status.as_u16(),
                "code": self.code,
            }
        }));

        (self.status, body).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), "InvalidBody", rejection.body_text())
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        Self::storage(err)
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::AlreadyEnrolled => Self::conflict(
                "AlreadyEnrolled",
                "You are already enrolled",
            ),
            OrderError::DuplicateOrderInFlight { .. } => Self::conflict(
                "DuplicateOrderInFlight",
                "An enrollment payment is already in progress",
            ),
            OrderError::GatewayUnavailable(_) => Self::unavailable(
                "GatewayUnavailable",
                "The payment gateway is unavailable, please try again shortly",
            ),
            OrderError::Storage(err) => Self::storage(err),
        }
    }
}

impl From<VerificationError> for AppError {
    fn from(err: VerificationError) -> Self {
        match err {
            VerificationError::NotFound { .. } => {
                Self::not_found("NotFound", "No payment exists for this order")
            }
            VerificationError::AlreadyFailed { .. } => Self::conflict(
                "AlreadyFailed",
                "This payment has already failed, please start a new enrollment",
            ),
            VerificationError::VerificationFailed { .. } => Self::unprocessable(
                "VerificationFailed",
                "Payment could not be verified, please retry enrollment",
            ),
            VerificationError::Storage(err) => Self::storage(err),
        }
    }
}

impl From<AdmissionError> for AppError {
    fn from(err: AdmissionError) -> Self {
        match err {
            AdmissionError::NotFound(_) => {
                Self::not_found("NotFound", "Admission confirmation not found")
            }
            AdmissionError::InvalidState { status } => Self::conflict(
                "InvalidState",
                format!("Admission confirmation is already {status}"),
            ),
            AdmissionError::StudentNotPending { status } => Self::conflict(
                "StudentNotPending",
                format!("Student enrollment is {status}, not pending"),
            ),
            AdmissionError::MissingReason => {
                Self::bad_request("MissingReason", "A rejection reason is required")
            }
            AdmissionError::Storage(err) => Self::storage(err),
        }
    }
}

impl From<ProgressError> for AppError {
    fn from(err: ProgressError) -> Self {
        match err {
            err @ ProgressError::UnknownLecture { .. } => {
                Self::not_found("UnknownLecture", err.to_string())
            }
            err @ ProgressError::UnknownCourse(_) => {
                Self::not_found("UnknownCourse", err.to_string())
            }
            ProgressError::Storage(err) => Self::storage(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use cohort_model::{AdmissionStatus, PaymentId};

    use super::*;
    use cohort_core::domain::enrollment::FailureReason;

    #[test]
    fn verification_failure_hides_reason() {
        let err = AppError::from(VerificationError::VerificationFailed {
            payment_id: PaymentId::new(),
            reason: FailureReason::AmountMismatch {
                expected: 1000,
                received: 1,
            },
        });

        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.code, "VerificationFailed");
        assert!(!err.message.contains("1000"));
    }

    #[test]
    fn storage_faults_are_generic() {
        let err = AppError::from(OrderError::Storage(CoreError::Database(
            "relation \"payments\" does not exist".into(),
        )));

        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message.contains("payments"));
    }

    #[test]
    fn decided_confirmation_is_a_conflict() {
        let err = AppError::from(AdmissionError::InvalidState {
            status: AdmissionStatus::Confirmed,
        });

        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(err.code, "InvalidState");
        assert!(err.message.contains("confirmed"));
    }
}
