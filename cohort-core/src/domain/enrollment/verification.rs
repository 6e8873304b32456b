use std::{any::type_name_of_val, fmt, sync::Arc};

use chrono::Utc;
use cohort_model::{
    AdmissionConfirmation, Payment, PaymentId, PaymentStatus,
    StudentEnrollment,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::state_machine::EnrollmentTransition;
use crate::{
    crypto::EnrollmentCrypto,
    database::ports::{
        payments::{PaymentRepository, Settlement},
        students::StudentRepository,
    },
    error::CoreError,
    sync::KeyedLocks,
};

/// Callback fields relayed from the gateway after checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentCallback {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
    pub amount_minor: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    SignatureMismatch,
    AmountMismatch { expected: i64, received: i64 },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::SignatureMismatch => f.write_str("signature mismatch"),
            FailureReason::AmountMismatch { expected, received } => {
                write!(f, "amount mismatch: expected {expected}, received {received}")
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct VerificationOutcome {
    pub payment: Payment,
    /// False for idempotent replays of an already verified payment.
    pub newly_verified: bool,
    pub enrollment: StudentEnrollment,
    /// Set only when this call performed the transition.
    pub transition: Option<EnrollmentTransition>,
    pub confirmation: Option<AdmissionConfirmation>,
}

#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("no payment exists for order {order_id}")]
    NotFound { order_id: String },
    #[error("payment {payment_id} has already failed")]
    AlreadyFailed { payment_id: PaymentId },
    #[error("payment {payment_id} could not be verified: {reason}")]
    VerificationFailed {
        payment_id: PaymentId,
        reason: FailureReason,
    },
    #[error(transparent)]
    Storage(#[from] CoreError),
}

/// Validates gateway callbacks and applies the `Created -> Verified`
/// transition at most once per payment.
///
/// A keyed lock per order reference serializes callbacks inside this
/// process; the repository's compare-and-set on the payment status is the
/// guard across processes.
pub struct PaymentVerifier {
    crypto: Arc<EnrollmentCrypto>,
    payments: Arc<dyn PaymentRepository>,
    students: Arc<dyn StudentRepository>,
    requires_confirmation: bool,
    locks: KeyedLocks<String>,
}

impl fmt::Debug for PaymentVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentVerifier")
            .field("payments", &type_name_of_val(self.payments.as_ref()))
            .field("students", &type_name_of_val(self.students.as_ref()))
            .field("requires_confirmation", &self.requires_confirmation)
            .finish()
    }
}

impl PaymentVerifier {
    pub fn new(
        crypto: Arc<EnrollmentCrypto>,
        payments: Arc<dyn PaymentRepository>,
        students: Arc<dyn StudentRepository>,
        requires_confirmation: bool,
    ) -> Self {
        Self {
            crypto,
            payments,
            students,
            requires_confirmation,
            locks: KeyedLocks::new(),
        }
    }

    pub async fn verify(
        &self,
        callback: &PaymentCallback,
    ) -> Result<VerificationOutcome, VerificationError> {
        let _guard = self.locks.lock(callback.order_id.clone()).await;

        let payment = self
            .payments
            .find_by_order_id(&callback.order_id)
            .await?
            .ok_or_else(|| {
                warn!(
                    target: "enrollment::forged",
                    order_id = %callback.order_id,
                    gateway_payment_id = %callback.payment_id,
                    "callback references an unknown order"
                );
                VerificationError::NotFound {
                    order_id: callback.order_id.clone(),
                }
            })?;

        match payment.status {
            PaymentStatus::Verified => return self.replay(payment).await,
            PaymentStatus::Failed => {
                return Err(VerificationError::AlreadyFailed {
                    payment_id: payment.id,
                });
            }
            PaymentStatus::Created => {}
        }

        if let Some(reason) = self.check(&payment, callback) {
            let moved = self
                .payments
                .mark_failed(payment.id, &reason.to_string(), Utc::now())
                .await?;
            if !moved {
                // A sibling settled or failed the payment first. This callback
                // is still rejected; the stored payment keeps the winner's state.
                let winner = self
                    .payments
                    .find_by_order_id(&payment.gateway_order_id)
                    .await?
                    .map(|current| current.status);
                info!(
                    payment_id = %payment.id,
                    order_id = %payment.gateway_order_id,
                    winning_status = ?winner,
                    %reason,
                    "rejected callback lost the race to another verification"
                );
            } else {
                info!(
                    payment_id = %payment.id,
                    order_id = %payment.gateway_order_id,
                    %reason,
                    "payment verification failed"
                );
            }
            return Err(VerificationError::VerificationFailed {
                payment_id: payment.id,
                reason,
            });
        }

        let settlement = Settlement {
            payment_id: payment.id,
            gateway_payment_id: callback.payment_id.clone(),
            settled_at: Utc::now(),
            requires_confirmation: self.requires_confirmation,
        };

        match self.payments.settle_verified(&settlement).await? {
            Some(receipt) => {
                info!(
                    payment_id = %receipt.payment.id,
                    student_id = %receipt.payment.student_id,
                    transition = ?receipt.transition,
                    enrollment_status = %receipt.enrollment.status,
                    "payment verified"
                );
                Ok(VerificationOutcome {
                    payment: receipt.payment,
                    newly_verified: true,
                    enrollment: receipt.enrollment,
                    transition: Some(receipt.transition),
                    confirmation: receipt.confirmation,
                })
            }
            None => {
                // Another process settled the payment between our read and
                // the compare-and-set; answer from its terminal state.
                let current = self
                    .payments
                    .find_by_order_id(&callback.order_id)
                    .await?
                    .ok_or_else(|| VerificationError::NotFound {
                        order_id: callback.order_id.clone(),
                    })?;
                match current.status {
                    PaymentStatus::Verified => self.replay(current).await,
                    PaymentStatus::Failed => {
                        Err(VerificationError::AlreadyFailed {
                            payment_id: current.id,
                        })
                    }
                    PaymentStatus::Created => Err(CoreError::Internal(format!(
                        "payment {} stayed created after a lost settlement",
                        current.id
                    ))
                    .into()),
                }
            }
        }
    }

    fn check(
        &self,
        payment: &Payment,
        callback: &PaymentCallback,
    ) -> Option<FailureReason> {
        if !self.crypto.verify_callback(
            &payment.gateway_order_id,
            &callback.payment_id,
            &callback.signature,
        ) {
            return Some(FailureReason::SignatureMismatch);
        }

        if callback.amount_minor != payment.amount_minor {
            return Some(FailureReason::AmountMismatch {
                expected: payment.amount_minor,
                received: callback.amount_minor,
            });
        }

        None
    }

    async fn replay(
        &self,
        payment: Payment,
    ) -> Result<VerificationOutcome, VerificationError> {
        debug!(payment_id = %payment.id, "replayed callback for verified payment");
        let enrollment = self.students.get_enrollment(payment.student_id).await?;
        Ok(VerificationOutcome {
            payment,
            newly_verified: false,
            enrollment,
            transition: None,
            confirmation: None,
        })
    }
}
