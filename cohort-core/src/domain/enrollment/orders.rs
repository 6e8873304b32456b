use std::{any::type_name_of_val, fmt, sync::Arc};

use chrono::Utc;
use cohort_model::{CourseId, EnrollmentStatus, PaymentId, StudentId};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    database::ports::{
        payments::{NewPayment, PaymentInsert, PaymentRepository},
        students::StudentRepository,
    },
    error::CoreError,
    gateway::{GatewayError, OrderRequest, PaymentGateway},
    sync::KeyedLocks,
};

/// The single enrollment-fee product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSettings {
    pub fee_minor: i64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedOrder {
    pub payment_id: PaymentId,
    pub order_id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub key_id: String,
}

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("student is already enrolled")]
    AlreadyEnrolled,
    #[error("an enrollment payment is already in flight")]
    DuplicateOrderInFlight { payment_id: Option<PaymentId> },
    #[error("payment gateway unavailable: {0}")]
    GatewayUnavailable(#[source] GatewayError),
    #[error(transparent)]
    Storage(#[from] CoreError),
}

/// Issues gateway orders for the enrollment fee and records the pending
/// payment. The gateway is called before anything is persisted, so a failed
/// call leaves no row behind.
pub struct OrderIssuer {
    gateway: Arc<dyn PaymentGateway>,
    payments: Arc<dyn PaymentRepository>,
    students: Arc<dyn StudentRepository>,
    settings: OrderSettings,
    locks: KeyedLocks<StudentId>,
}

impl fmt::Debug for OrderIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderIssuer")
            .field("gateway", &type_name_of_val(self.gateway.as_ref()))
            .field("payments", &type_name_of_val(self.payments.as_ref()))
            .field("students", &type_name_of_val(self.students.as_ref()))
            .field("settings", &self.settings)
            .finish()
    }
}

impl OrderIssuer {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        payments: Arc<dyn PaymentRepository>,
        students: Arc<dyn StudentRepository>,
        settings: OrderSettings,
    ) -> Self {
        Self {
            gateway,
            payments,
            students,
            settings,
            locks: KeyedLocks::new(),
        }
    }

    pub fn settings(&self) -> &OrderSettings {
        &self.settings
    }

    pub async fn issue(
        &self,
        student_id: StudentId,
        course_id: Option<CourseId>,
    ) -> Result<IssuedOrder, OrderError> {
        // Serialize issuance per student so racing requests do not each
        // create a gateway order only for one insert to win.
        let _guard = self.locks.lock(student_id).await;

        let enrollment = self.students.get_enrollment(student_id).await?;
        if enrollment.status == EnrollmentStatus::Approved {
            return Err(OrderError::AlreadyEnrolled);
        }

        if let Some(active) =
            self.payments.find_active_for_student(student_id).await?
        {
            return Err(OrderError::DuplicateOrderInFlight {
                payment_id: Some(active.id),
            });
        }

        let order = self
            .gateway
            .create_order(&OrderRequest {
                amount_minor: self.settings.fee_minor,
                currency: self.settings.currency.clone(),
                receipt: format!("rcpt_{}", Uuid::now_v7().simple()),
            })
            .await
            .map_err(|err| {
                warn!(%student_id, error = %err, "gateway order creation failed");
                OrderError::GatewayUnavailable(err)
            })?;

        let inserted = self
            .payments
            .insert_payment(NewPayment {
                student_id,
                course_id,
                amount_minor: self.settings.fee_minor,
                currency: self.settings.currency.clone(),
                gateway_order_id: order.order_id.clone(),
                created_at: Utc::now(),
            })
            .await;

        match inserted {
            Ok(PaymentInsert::Created(payment)) => {
                info!(
                    %student_id,
                    payment_id = %payment.id,
                    order_id = %payment.gateway_order_id,
                    "enrollment order issued"
                );
                Ok(IssuedOrder {
                    payment_id: payment.id,
                    order_id: payment.gateway_order_id,
                    amount_minor: payment.amount_minor,
                    currency: payment.currency,
                    key_id: self.gateway.key_id().to_string(),
                })
            }
            Ok(PaymentInsert::ActivePaymentExists) => {
                // Another process won the insert; the gateway order we just
                // created is never paid and expires on the gateway side.
                warn!(
                    target: "enrollment::reconcile",
                    %student_id,
                    order_id = %order.order_id,
                    "discarding gateway order after losing active-payment race"
                );
                Err(OrderError::DuplicateOrderInFlight { payment_id: None })
            }
            Err(err) => {
                error!(
                    target: "enrollment::reconcile",
                    %student_id,
                    order_id = %order.order_id,
                    amount_minor = self.settings.fee_minor,
                    currency = %self.settings.currency,
                    error = %err,
                    "gateway order created but payment row was not persisted"
                );
                Err(OrderError::Storage(err))
            }
        }
    }
}
