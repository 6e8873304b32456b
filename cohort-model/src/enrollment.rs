use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};

use crate::{
    error::ModelError,
    ids::{CourseId, PaymentId, StudentId},
};

/// Enrollment status of a student for the enrollment-fee product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EnrollmentStatus {
    #[default]
    NotEnrolled,
    Pending,
    Approved,
    Rejected,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStatus::NotEnrolled => "not_enrolled",
            EnrollmentStatus::Pending => "pending",
            EnrollmentStatus::Approved => "approved",
            EnrollmentStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnrollmentStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_enrolled" => Ok(EnrollmentStatus::NotEnrolled),
            "pending" => Ok(EnrollmentStatus::Pending),
            "approved" => Ok(EnrollmentStatus::Approved),
            "rejected" => Ok(EnrollmentStatus::Rejected),
            other => Err(ModelError::UnknownStatus {
                kind: "enrollment",
                value: other.to_string(),
            }),
        }
    }
}

/// Lifecycle of a single enrollment-fee payment. `Verified` and `Failed` are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PaymentStatus {
    Created,
    Verified,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Created => "created",
            PaymentStatus::Verified => "verified",
            PaymentStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Created)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(PaymentStatus::Created),
            "verified" => Ok(PaymentStatus::Verified),
            "failed" => Ok(PaymentStatus::Failed),
            other => Err(ModelError::UnknownStatus {
                kind: "payment",
                value: other.to_string(),
            }),
        }
    }
}

/// Persisted enrollment-fee payment.
///
/// `active` holds the per-student uniqueness slot: it is set on creation and
/// released when the payment fails or when its admission is rejected, so a
/// rejected student can pay again while the verified row stays terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Payment {
    pub id: PaymentId,
    pub student_id: StudentId,
    pub course_id: Option<CourseId>,
    pub amount_minor: i64,
    pub currency: String,
    pub gateway_order_id: String,
    pub gateway_payment_id: Option<String>,
    pub status: PaymentStatus,
    pub active: bool,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

/// Current enrollment view of a student. Students without a stored row are
/// reported through [`StudentEnrollment::not_enrolled`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct StudentEnrollment {
    pub student_id: StudentId,
    pub status: EnrollmentStatus,
    pub payment_completed: bool,
}

impl StudentEnrollment {
    pub fn not_enrolled(student_id: StudentId) -> Self {
        Self {
            student_id,
            status: EnrollmentStatus::NotEnrolled,
            payment_completed: false,
        }
    }
}

/// Validate an ISO-4217 style currency code (three ASCII letters) and return
/// it upper-cased.
pub fn normalize_currency(code: &str) -> Result<String, ModelError> {
    let trimmed = code.trim();
    if trimmed.len() == 3 && trimmed.chars().all(|c| c.is_ascii_alphabetic())
    {
        Ok(trimmed.to_ascii_uppercase())
    } else {
        Err(ModelError::InvalidCurrency(code.to_string()))
    }
}
