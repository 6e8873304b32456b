use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cohort_model::{
    AdmissionConfirmation, AdmissionStatus, ConfirmationId, Payment,
    PaymentId, StudentEnrollment, StudentId,
};
use sqlx::{PgPool, Postgres, Transaction};

use super::rows::{PAYMENT_COLUMNS, db_err, map_enrollment, map_payment};
use crate::database::ports::payments::{
    NewPayment, PaymentInsert, PaymentRepository, Settlement,
    SettlementReceipt,
};
use crate::domain::enrollment::state_machine::on_payment_verified;
use crate::error::{CoreError, Result};

#[derive(Debug, Clone)]
pub struct PostgresPaymentRepository {
    pool: PgPool,
}

impl PostgresPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Ensure the student row exists and lock it for the rest of the
/// transaction.
pub(super) async fn lock_student(
    tx: &mut Transaction<'_, Postgres>,
    student_id: StudentId,
) -> Result<StudentEnrollment> {
    sqlx::query("INSERT INTO students (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
        .bind(student_id.to_uuid())
        .execute(&mut **tx)
        .await
        .map_err(db_err("Failed to ensure student row"))?;

    let row = sqlx::query(
        r#"
        SELECT enrollment_status, payment_completed
        FROM students
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(student_id.to_uuid())
    .fetch_one(&mut **tx)
    .await
    .map_err(db_err("Failed to lock student row"))?;

    map_enrollment(student_id, &row)
}

#[async_trait]
impl PaymentRepository for PostgresPaymentRepository {
    async fn insert_payment(&self, payment: NewPayment) -> Result<PaymentInsert> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_err("Failed to begin payment transaction"))?;

        sqlx::query("INSERT INTO students (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
            .bind(payment.student_id.to_uuid())
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to ensure student row"))?;

        // The partial unique index is the arbiter; a conflict means another
        // payment already holds the student's active slot.
        let sql = format!(
            r#"
            INSERT INTO payments
                (id, student_id, course_id, amount_minor, currency,
                 gateway_order_id, status, active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, 'created', TRUE, $7)
            ON CONFLICT (student_id) WHERE active DO NOTHING
            RETURNING {PAYMENT_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(PaymentId::new().to_uuid())
            .bind(payment.student_id.to_uuid())
            .bind(payment.course_id.map(|id| id.to_uuid()))
            .bind(payment.amount_minor)
            .bind(&payment.currency)
            .bind(&payment.gateway_order_id)
            .bind(payment.created_at)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err("Failed to insert payment"))?;

        let Some(row) = row else {
            return Ok(PaymentInsert::ActivePaymentExists);
        };
        let created = map_payment(&row)?;

        tx.commit()
            .await
            .map_err(db_err("Failed to commit payment"))?;
        Ok(PaymentInsert::Created(created))
    }

    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<Payment>> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE gateway_order_id = $1"
        );
        let row = sqlx::query(&sql)
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to load payment by order"))?;

        row.as_ref().map(map_payment).transpose()
    }

    async fn find_active_for_student(
        &self,
        student_id: StudentId,
    ) -> Result<Option<Payment>> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE student_id = $1 AND active"
        );
        let row = sqlx::query(&sql)
            .bind(student_id.to_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to load active payment"))?;

        row.as_ref().map(map_payment).transpose()
    }

    async fn mark_failed(
        &self,
        payment_id: PaymentId,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET status = 'failed',
                active = FALSE,
                failure_reason = $2,
                settled_at = $3
            WHERE id = $1 AND status = 'created'
            "#,
        )
        .bind(payment_id.to_uuid())
        .bind(reason)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to mark payment failed"))?;

        Ok(result.rows_affected() == 1)
    }

    async fn settle_verified(
        &self,
        settlement: &Settlement,
    ) -> Result<Option<SettlementReceipt>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_err("Failed to begin settlement transaction"))?;

        let sql = format!(
            r#"
            UPDATE payments
            SET status = 'verified',
                gateway_payment_id = $2,
                settled_at = $3
            WHERE id = $1 AND status = 'created'
            RETURNING {PAYMENT_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(settlement.payment_id.to_uuid())
            .bind(&settlement.gateway_payment_id)
            .bind(settlement.settled_at)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err("Failed to verify payment"))?;

        // Lost the compare-and-set; dropping the transaction rolls back.
        let Some(row) = row else {
            return Ok(None);
        };
        let payment = map_payment(&row)?;

        let current = lock_student(&mut tx, payment.student_id).await?;
        let transition = on_payment_verified(
            current.status,
            settlement.requires_confirmation,
        );
        let enrollment = StudentEnrollment {
            student_id: payment.student_id,
            status: transition.target(current.status),
            payment_completed: true,
        };

        sqlx::query(
            r#"
            UPDATE students
            SET enrollment_status = $2,
                payment_completed = TRUE,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(enrollment.student_id.to_uuid())
        .bind(enrollment.status.as_str())
        .execute(&mut *tx)
        .await
        .map_err(db_err("Failed to update student enrollment"))?;

        let confirmation = if transition.opens_confirmation() {
            let confirmation = AdmissionConfirmation {
                id: ConfirmationId::new(),
                student_id: payment.student_id,
                course_id: payment.course_id,
                payment_id: payment.id,
                status: AdmissionStatus::Pending,
                rejection_reason: None,
                notes: None,
                decided_by: None,
                decided_at: None,
                created_at: settlement.settled_at,
                gateway_order_id: payment.gateway_order_id.clone(),
                gateway_payment_id: payment.gateway_payment_id.clone(),
            };

            sqlx::query(
                r#"
                INSERT INTO admission_confirmations
                    (id, student_id, course_id, payment_id, status, created_at)
                VALUES ($1, $2, $3, $4, 'pending', $5)
                "#,
            )
            .bind(confirmation.id.to_uuid())
            .bind(confirmation.student_id.to_uuid())
            .bind(confirmation.course_id.map(|id| id.to_uuid()))
            .bind(confirmation.payment_id.to_uuid())
            .bind(confirmation.created_at)
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to open admission confirmation"))?;

            Some(confirmation)
        } else {
            None
        };

        tx.commit()
            .await
            .map_err(db_err("Failed to commit settlement"))?;

        Ok(Some(SettlementReceipt {
            payment,
            transition,
            enrollment,
            confirmation,
        }))
    }
}
