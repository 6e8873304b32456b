//! Row decoding shared by the repositories that read payments, students and
//! confirmations.

use chrono::{DateTime, Utc};
use cohort_model::{
    AdmissionConfirmation, AdmissionStatus, EnrollmentStatus, Payment,
    PaymentStatus, StudentEnrollment, StudentId,
};
use sqlx::{Postgres, Row, postgres::PgRow};
use uuid::Uuid;

use crate::error::{CoreError, Result};

pub(super) const PAYMENT_COLUMNS: &str = "id, student_id, course_id, \
     amount_minor, currency, gateway_order_id, gateway_payment_id, status, \
     active, failure_reason, created_at, settled_at";

pub(super) const CONFIRMATION_SELECT: &str = r#"
    SELECT
        c.id,
        c.student_id,
        c.course_id,
        c.payment_id,
        c.status,
        c.rejection_reason,
        c.notes,
        c.decided_by,
        c.decided_at,
        c.created_at,
        p.gateway_order_id,
        p.gateway_payment_id
    FROM admission_confirmations c
    JOIN payments p ON p.id = c.payment_id
"#;

pub(super) fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name).map_err(|e| {
        CoreError::Database(format!("Failed to read column {name}: {e}"))
    })
}

pub(super) fn db_err(
    context: &str,
) -> impl FnOnce(sqlx::Error) -> CoreError + '_ {
    move |e| CoreError::Database(format!("{context}: {e}"))
}

pub(super) fn map_payment(row: &PgRow) -> Result<Payment> {
    let status: String = column(row, "status")?;
    Ok(Payment {
        id: column::<Uuid>(row, "id")?.into(),
        student_id: column::<Uuid>(row, "student_id")?.into(),
        course_id: column::<Option<Uuid>>(row, "course_id")?.map(Into::into),
        amount_minor: column(row, "amount_minor")?,
        currency: column(row, "currency")?,
        gateway_order_id: column(row, "gateway_order_id")?,
        gateway_payment_id: column(row, "gateway_payment_id")?,
        status: status.parse::<PaymentStatus>()?,
        active: column(row, "active")?,
        failure_reason: column(row, "failure_reason")?,
        created_at: column::<DateTime<Utc>>(row, "created_at")?,
        settled_at: column(row, "settled_at")?,
    })
}

pub(super) fn map_confirmation(row: &PgRow) -> Result<AdmissionConfirmation> {
    let status: String = column(row, "status")?;
    Ok(AdmissionConfirmation {
        id: column::<Uuid>(row, "id")?.into(),
        student_id: column::<Uuid>(row, "student_id")?.into(),
        course_id: column::<Option<Uuid>>(row, "course_id")?.map(Into::into),
        payment_id: column::<Uuid>(row, "payment_id")?.into(),
        status: status.parse::<AdmissionStatus>()?,
        rejection_reason: column(row, "rejection_reason")?,
        notes: column(row, "notes")?,
        decided_by: column::<Option<Uuid>>(row, "decided_by")?.map(Into::into),
        decided_at: column(row, "decided_at")?,
        created_at: column(row, "created_at")?,
        gateway_order_id: column(row, "gateway_order_id")?,
        gateway_payment_id: column(row, "gateway_payment_id")?,
    })
}

/// Decode `enrollment_status, payment_completed` for a known student.
pub(super) fn map_enrollment(
    student_id: StudentId,
    row: &PgRow,
) -> Result<StudentEnrollment> {
    let status: String = column(row, "enrollment_status")?;
    Ok(StudentEnrollment {
        student_id,
        status: status.parse::<EnrollmentStatus>()?,
        payment_completed: column(row, "payment_completed")?,
    })
}

/// Escape `LIKE` metacharacters and wrap the term for a substring match.
pub(super) fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}
