use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cohort_model::{
    AdmissionConfirmation, CourseId, Payment, PaymentId, StudentEnrollment,
    StudentId,
};

use crate::domain::enrollment::state_machine::EnrollmentTransition;
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub student_id: StudentId,
    pub course_id: Option<CourseId>,
    pub amount_minor: i64,
    pub currency: String,
    pub gateway_order_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum PaymentInsert {
    Created(Payment),
    /// The student already holds an active payment; nothing was written.
    ActivePaymentExists,
}

/// A verified callback ready to be applied.
#[derive(Debug, Clone)]
pub struct Settlement {
    pub payment_id: PaymentId,
    pub gateway_payment_id: String,
    pub settled_at: DateTime<Utc>,
    pub requires_confirmation: bool,
}

/// Everything a successful settlement changed, read back inside the same
/// transaction.
#[derive(Debug, Clone)]
pub struct SettlementReceipt {
    pub payment: Payment,
    pub transition: EnrollmentTransition,
    pub enrollment: StudentEnrollment,
    pub confirmation: Option<AdmissionConfirmation>,
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Insert a `Created` payment unless the student already holds an
    /// active one.
    async fn insert_payment(&self, payment: NewPayment) -> Result<PaymentInsert>;

    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<Payment>>;

    async fn find_active_for_student(
        &self,
        student_id: StudentId,
    ) -> Result<Option<Payment>>;

    /// Compare-and-set `Created -> Failed`, releasing the active slot.
    /// Returns false when the payment was no longer `Created`.
    async fn mark_failed(
        &self,
        payment_id: PaymentId,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<bool>;

    /// Compare-and-set `Created -> Verified` and apply the resulting
    /// enrollment transition (student row plus admission confirmation) in
    /// one atomic unit. Returns `None` when the payment was no longer
    /// `Created`, in which case nothing was written.
    async fn settle_verified(
        &self,
        settlement: &Settlement,
    ) -> Result<Option<SettlementReceipt>>;
}
