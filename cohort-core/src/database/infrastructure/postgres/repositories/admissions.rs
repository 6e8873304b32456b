use async_trait::async_trait;
use cohort_model::{
    AdmissionConfirmation, AdmissionDecision, AdmissionFilter, AdmissionPage,
    AdmissionStats, AdmissionStatus, ConfirmationId, StudentEnrollment,
    StudentId,
};
use sqlx::PgPool;

use super::payments::lock_student;
use super::rows::{
    CONFIRMATION_SELECT, column, db_err, like_pattern, map_confirmation,
};
use crate::database::ports::admissions::{
    AdmissionRepository, DecisionOutcome, DecisionRecord,
};
use crate::domain::enrollment::state_machine::on_admission_decision;
use crate::error::{CoreError, Result};

#[derive(Debug, Clone)]
pub struct PostgresAdmissionRepository {
    pool: PgPool,
}

impl PostgresAdmissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const FILTER_CLAUSE: &str = r#"
    WHERE ($1::text IS NULL OR c.status = $1)
      AND ($2::text IS NULL
           OR p.gateway_order_id ILIKE $2
           OR p.gateway_payment_id ILIKE $2)
"#;

#[async_trait]
impl AdmissionRepository for PostgresAdmissionRepository {
    async fn get(
        &self,
        confirmation_id: ConfirmationId,
    ) -> Result<Option<AdmissionConfirmation>> {
        let sql = format!("{CONFIRMATION_SELECT} WHERE c.id = $1");
        let row = sqlx::query(&sql)
            .bind(confirmation_id.to_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to load admission confirmation"))?;

        row.as_ref().map(map_confirmation).transpose()
    }

    async fn latest_for_student(
        &self,
        student_id: StudentId,
    ) -> Result<Option<AdmissionConfirmation>> {
        let sql = format!(
            "{CONFIRMATION_SELECT} WHERE c.student_id = $1 \
             ORDER BY c.created_at DESC, c.id DESC LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(student_id.to_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to load latest confirmation"))?;

        row.as_ref().map(map_confirmation).transpose()
    }

    async fn decide(&self, record: &DecisionRecord) -> Result<DecisionOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_err("Failed to begin decision transaction"))?;

        let sql = format!("{CONFIRMATION_SELECT} WHERE c.id = $1 FOR UPDATE OF c");
        let row = sqlx::query(&sql)
            .bind(record.confirmation_id.to_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err("Failed to lock admission confirmation"))?;

        let Some(row) = row else {
            return Ok(DecisionOutcome::NotFound);
        };
        let mut confirmation = map_confirmation(&row)?;
        if confirmation.status != AdmissionStatus::Pending {
            return Ok(DecisionOutcome::NotPending(confirmation));
        }

        let current = lock_student(&mut tx, confirmation.student_id).await?;
        let next = match on_admission_decision(current.status, &record.decision)
        {
            Ok(next) => next,
            Err(conflict) => {
                return Ok(DecisionOutcome::StudentConflict {
                    confirmation,
                    status: conflict.from,
                });
            }
        };

        let target = record.decision.target_status();
        let updated = sqlx::query(
            r#"
            UPDATE admission_confirmations
            SET status = $2,
                rejection_reason = $3,
                notes = $4,
                decided_by = $5,
                decided_at = $6
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(confirmation.id.to_uuid())
        .bind(target.as_str())
        .bind(record.decision.rejection_reason())
        .bind(record.decision.notes())
        .bind(record.staff_id.to_uuid())
        .bind(record.decided_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err("Failed to record admission decision"))?;

        if updated.rows_affected() != 1 {
            return Err(CoreError::Internal(format!(
                "confirmation {} changed while locked",
                confirmation.id
            )));
        }

        sqlx::query(
            r#"
            UPDATE students
            SET enrollment_status = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(confirmation.student_id.to_uuid())
        .bind(next.as_str())
        .execute(&mut *tx)
        .await
        .map_err(db_err("Failed to update student enrollment"))?;

        if let AdmissionDecision::Reject { .. } = record.decision {
            sqlx::query("UPDATE payments SET active = FALSE WHERE id = $1")
                .bind(confirmation.payment_id.to_uuid())
                .execute(&mut *tx)
                .await
                .map_err(db_err("Failed to release rejected payment"))?;
        }

        tx.commit()
            .await
            .map_err(db_err("Failed to commit admission decision"))?;

        confirmation.status = target;
        confirmation.rejection_reason =
            record.decision.rejection_reason().map(str::to_string);
        confirmation.notes = record.decision.notes().map(str::to_string);
        confirmation.decided_by = Some(record.staff_id);
        confirmation.decided_at = Some(record.decided_at);

        Ok(DecisionOutcome::Decided {
            enrollment: StudentEnrollment {
                student_id: confirmation.student_id,
                status: next,
                payment_completed: current.payment_completed,
            },
            confirmation,
        })
    }

    async fn list(&self, filter: &AdmissionFilter) -> Result<AdmissionPage> {
        let status = filter.status.map(|status| status.as_str());
        let search = filter.search.as_deref().map(like_pattern);

        let count_sql = format!(
            "SELECT COUNT(*) AS total FROM admission_confirmations c \
             JOIN payments p ON p.id = c.payment_id {FILTER_CLAUSE}"
        );
        let total: i64 = sqlx::query(&count_sql)
            .bind(status)
            .bind(search.as_deref())
            .fetch_one(&self.pool)
            .await
            .map_err(db_err("Failed to count admission confirmations"))
            .and_then(|row| column(&row, "total"))?;

        let list_sql = format!(
            "{CONFIRMATION_SELECT} {FILTER_CLAUSE} \
             ORDER BY c.created_at DESC, c.id DESC LIMIT $3 OFFSET $4"
        );
        let rows = sqlx::query(&list_sql)
            .bind(status)
            .bind(search.as_deref())
            .bind(i64::from(filter.limit))
            .bind(i64::try_from(filter.offset()).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("Failed to list admission confirmations"))?;

        Ok(AdmissionPage {
            items: rows
                .iter()
                .map(map_confirmation)
                .collect::<Result<Vec<_>>>()?,
            total: u64::try_from(total).unwrap_or_default(),
            page: filter.page,
            limit: filter.limit,
        })
    }

    async fn stats(&self) -> Result<AdmissionStats> {
        let rows = sqlx::query(
            r#"
            SELECT status, COUNT(*) AS count
            FROM admission_confirmations
            GROUP BY status
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to compute admission stats"))?;

        let mut stats = AdmissionStats::default();
        for row in &rows {
            let status: String = column(row, "status")?;
            let count: i64 = column(row, "count")?;
            let count = u64::try_from(count).unwrap_or_default();
            match status.parse::<AdmissionStatus>()? {
                AdmissionStatus::Pending => stats.pending = count,
                AdmissionStatus::Confirmed => stats.confirmed = count,
                AdmissionStatus::Rejected => stats.rejected = count,
            }
            stats.total += count;
        }
        Ok(stats)
    }
}
