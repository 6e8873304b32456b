//! Student enrollment transitions as pure functions. Storage adapters call
//! these inside their transactions so both backends share one rule set.

use cohort_model::{AdmissionDecision, EnrollmentStatus};
use thiserror::Error;

/// What a verified payment does to the owning student.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentTransition {
    /// Move to `Pending` and open an admission confirmation.
    EnterPending,
    /// Move straight to `Approved`; the program needs no staff decision.
    Approve,
    /// Already `Pending` or `Approved`; nothing changes.
    NoOp,
}

impl EnrollmentTransition {
    pub fn target(&self, current: EnrollmentStatus) -> EnrollmentStatus {
        match self {
            EnrollmentTransition::EnterPending => EnrollmentStatus::Pending,
            EnrollmentTransition::Approve => EnrollmentStatus::Approved,
            EnrollmentTransition::NoOp => current,
        }
    }

    pub fn opens_confirmation(&self) -> bool {
        matches!(self, EnrollmentTransition::EnterPending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot move enrollment from {from} to {to}")]
pub struct TransitionConflict {
    pub from: EnrollmentStatus,
    pub to: EnrollmentStatus,
}

/// Transition triggered by a payment reaching `Verified`.
///
/// A `Rejected` student may only get here with a fresh payment (the
/// rejected one no longer holds the active slot), which re-enters the flow.
pub fn on_payment_verified(
    current: EnrollmentStatus,
    requires_confirmation: bool,
) -> EnrollmentTransition {
    match current {
        EnrollmentStatus::Pending | EnrollmentStatus::Approved => {
            EnrollmentTransition::NoOp
        }
        EnrollmentStatus::NotEnrolled | EnrollmentStatus::Rejected => {
            if requires_confirmation {
                EnrollmentTransition::EnterPending
            } else {
                EnrollmentTransition::Approve
            }
        }
    }
}

/// Student status after a staff decision. Only `Pending` students move.
pub fn on_admission_decision(
    current: EnrollmentStatus,
    decision: &AdmissionDecision,
) -> Result<EnrollmentStatus, TransitionConflict> {
    let to = match decision {
        AdmissionDecision::Confirm { .. } => EnrollmentStatus::Approved,
        AdmissionDecision::Reject { .. } => EnrollmentStatus::Rejected,
    };

    if current == EnrollmentStatus::Pending {
        Ok(to)
    } else {
        Err(TransitionConflict { from: current, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use EnrollmentStatus::*;

    #[test]
    fn verified_payment_opens_confirmation_when_required() {
        let transition = on_payment_verified(NotEnrolled, true);
        assert_eq!(transition, EnrollmentTransition::EnterPending);
        assert!(transition.opens_confirmation());
        assert_eq!(transition.target(NotEnrolled), Pending);
    }

    #[test]
    fn verified_payment_skips_pending_without_confirmation() {
        let transition = on_payment_verified(NotEnrolled, false);
        assert_eq!(transition, EnrollmentTransition::Approve);
        assert!(!transition.opens_confirmation());
        assert_eq!(transition.target(NotEnrolled), Approved);
    }

    #[test]
    fn retriggering_is_a_no_op() {
        for current in [Pending, Approved] {
            for required in [true, false] {
                let transition = on_payment_verified(current, required);
                assert_eq!(transition, EnrollmentTransition::NoOp);
                assert_eq!(transition.target(current), current);
            }
        }
    }

    #[test]
    fn rejected_students_reenter_with_a_new_payment() {
        assert_eq!(
            on_payment_verified(Rejected, true),
            EnrollmentTransition::EnterPending
        );
    }

    #[test]
    fn decisions_only_move_pending_students() {
        let confirm = AdmissionDecision::Confirm { notes: None };
        let reject = AdmissionDecision::Reject {
            reason: "incomplete documents".into(),
            notes: None,
        };

        assert_eq!(on_admission_decision(Pending, &confirm), Ok(Approved));
        assert_eq!(on_admission_decision(Pending, &reject), Ok(Rejected));

        for terminal in [Approved, Rejected, NotEnrolled] {
            assert!(on_admission_decision(terminal, &confirm).is_err());
            assert!(on_admission_decision(terminal, &reject).is_err());
        }
    }
}
