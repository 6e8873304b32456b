use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cohort_model::{
    AdmissionConfirmation, AdmissionDecision, AdmissionFilter, AdmissionPage,
    AdmissionStats, ConfirmationId, EnrollmentStatus, StaffId,
    StudentEnrollment, StudentId,
};

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct DecisionRecord {
    pub confirmation_id: ConfirmationId,
    pub decision: AdmissionDecision,
    pub staff_id: StaffId,
    pub decided_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum DecisionOutcome {
    Decided {
        confirmation: AdmissionConfirmation,
        enrollment: StudentEnrollment,
    },
    /// The confirmation had already left `Pending`; it is returned as
    /// stored.
    NotPending(AdmissionConfirmation),
    /// The owning student was not in a state the decision can move.
    StudentConflict {
        confirmation: AdmissionConfirmation,
        status: EnrollmentStatus,
    },
    NotFound,
}

#[async_trait]
pub trait AdmissionRepository: Send + Sync {
    async fn get(
        &self,
        confirmation_id: ConfirmationId,
    ) -> Result<Option<AdmissionConfirmation>>;

    async fn latest_for_student(
        &self,
        student_id: StudentId,
    ) -> Result<Option<AdmissionConfirmation>>;

    /// Compare-and-set `Pending -> Confirmed|Rejected` together with the
    /// student's status. Rejection also releases the payment's active slot.
    async fn decide(&self, record: &DecisionRecord) -> Result<DecisionOutcome>;

    async fn list(&self, filter: &AdmissionFilter) -> Result<AdmissionPage>;

    async fn stats(&self) -> Result<AdmissionStats>;
}
