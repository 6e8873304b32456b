use std::collections::HashSet;

use async_trait::async_trait;
use cohort_model::{CompletionRecord, CourseId, LectureId, StudentId};
use sqlx::PgPool;
use uuid::Uuid;

use super::rows::column;
use crate::database::ports::completions::CompletionRepository;
use crate::error::{CoreError, Result};

#[derive(Debug, Clone)]
pub struct PostgresCompletionRepository {
    pool: PgPool,
}

impl PostgresCompletionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CompletionRepository for PostgresCompletionRepository {
    async fn record_completion(&self, record: &CompletionRecord) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO course_completions (student_id, course_id, lecture_id, completed_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (student_id, course_id, lecture_id) DO NOTHING
            "#,
        )
        .bind(record.student_id.to_uuid())
        .bind(record.course_id.to_uuid())
        .bind(record.lecture_id.to_uuid())
        .bind(record.completed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            CoreError::Database(format!("Failed to record completion: {e}"))
        })?;

        Ok(result.rows_affected() == 1)
    }

    async fn completed_lectures(
        &self,
        student_id: StudentId,
        course_id: CourseId,
    ) -> Result<HashSet<LectureId>> {
        let rows = sqlx::query(
            r#"
            SELECT lecture_id
            FROM course_completions
            WHERE student_id = $1 AND course_id = $2
            "#,
        )
        .bind(student_id.to_uuid())
        .bind(course_id.to_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            CoreError::Database(format!("Failed to load completions: {e}"))
        })?;

        rows.iter()
            .map(|row| column::<Uuid>(row, "lecture_id").map(LectureId::from))
            .collect()
    }
}
