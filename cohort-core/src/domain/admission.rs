//! Staff review of verified enrollment payments.

use std::{any::type_name_of_val, fmt, sync::Arc};

use chrono::Utc;
use cohort_model::{
    AdmissionConfirmation, AdmissionDecision, AdmissionFilter, AdmissionPage,
    AdmissionStats, AdmissionStatus, ConfirmationId, EnrollmentStatus,
    StaffId, StudentEnrollment,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    database::ports::admissions::{
        AdmissionRepository, DecisionOutcome, DecisionRecord,
    },
    error::CoreError,
};

#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("admission confirmation {0} not found")]
    NotFound(ConfirmationId),
    #[error("admission confirmation is already {status}")]
    InvalidState { status: AdmissionStatus },
    #[error("student enrollment is {status}, expected pending")]
    StudentNotPending { status: EnrollmentStatus },
    #[error("a rejection reason is required")]
    MissingReason,
    #[error(transparent)]
    Storage(#[from] CoreError),
}

/// Result of a successful staff decision.
#[derive(Debug, Clone)]
pub struct AdmissionDecided {
    pub confirmation: AdmissionConfirmation,
    pub enrollment: StudentEnrollment,
}

#[derive(Clone)]
pub struct AdmissionWorkflow {
    admissions: Arc<dyn AdmissionRepository>,
}

impl fmt::Debug for AdmissionWorkflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdmissionWorkflow")
            .field("admissions", &type_name_of_val(self.admissions.as_ref()))
            .finish()
    }
}

impl AdmissionWorkflow {
    pub fn new(admissions: Arc<dyn AdmissionRepository>) -> Self {
        Self { admissions }
    }

    pub async fn confirm(
        &self,
        confirmation_id: ConfirmationId,
        staff_id: StaffId,
        notes: Option<String>,
    ) -> Result<AdmissionDecided, AdmissionError> {
        let decision = AdmissionDecision::Confirm {
            notes: clean(notes),
        };
        self.decide(confirmation_id, staff_id, decision).await
    }

    pub async fn reject(
        &self,
        confirmation_id: ConfirmationId,
        staff_id: StaffId,
        reason: &str,
        notes: Option<String>,
    ) -> Result<AdmissionDecided, AdmissionError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AdmissionError::MissingReason);
        }

        let decision = AdmissionDecision::Reject {
            reason: reason.to_string(),
            notes: clean(notes),
        };
        self.decide(confirmation_id, staff_id, decision).await
    }

    pub async fn get(
        &self,
        confirmation_id: ConfirmationId,
    ) -> Result<AdmissionConfirmation, AdmissionError> {
        self.admissions
            .get(confirmation_id)
            .await?
            .ok_or(AdmissionError::NotFound(confirmation_id))
    }

    pub async fn list(
        &self,
        filter: AdmissionFilter,
    ) -> Result<AdmissionPage, AdmissionError> {
        Ok(self.admissions.list(&filter.normalized()).await?)
    }

    pub async fn stats(&self) -> Result<AdmissionStats, AdmissionError> {
        Ok(self.admissions.stats().await?)
    }

    async fn decide(
        &self,
        confirmation_id: ConfirmationId,
        staff_id: StaffId,
        decision: AdmissionDecision,
    ) -> Result<AdmissionDecided, AdmissionError> {
        let target = decision.target_status();
        let record = DecisionRecord {
            confirmation_id,
            decision,
            staff_id,
            decided_at: Utc::now(),
        };

        match self.admissions.decide(&record).await? {
            DecisionOutcome::Decided {
                confirmation,
                enrollment,
            } => {
                info!(
                    confirmation_id = %confirmation.id,
                    student_id = %confirmation.student_id,
                    %staff_id,
                    status = %confirmation.status,
                    "admission decided"
                );
                Ok(AdmissionDecided {
                    confirmation,
                    enrollment,
                })
            }
            DecisionOutcome::NotPending(confirmation) => {
                Err(AdmissionError::InvalidState {
                    status: confirmation.status,
                })
            }
            DecisionOutcome::StudentConflict {
                confirmation,
                status,
            } => {
                warn!(
                    confirmation_id = %confirmation.id,
                    student_id = %confirmation.student_id,
                    student_status = %status,
                    requested = %target,
                    "pending confirmation whose student is not pending"
                );
                Err(AdmissionError::StudentNotPending { status })
            }
            DecisionOutcome::NotFound => {
                Err(AdmissionError::NotFound(confirmation_id))
            }
        }
    }
}

fn clean(notes: Option<String>) -> Option<String> {
    notes
        .map(|note| note.trim().to_string())
        .filter(|note| !note.is_empty())
}
