use async_trait::async_trait;
use cohort_model::{StudentEnrollment, StudentId};
use sqlx::PgPool;

use super::rows::map_enrollment;
use crate::database::ports::students::StudentRepository;
use crate::error::{CoreError, Result};

#[derive(Debug, Clone)]
pub struct PostgresStudentRepository {
    pool: PgPool,
}

impl PostgresStudentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StudentRepository for PostgresStudentRepository {
    async fn get_enrollment(
        &self,
        student_id: StudentId,
    ) -> Result<StudentEnrollment> {
        let row = sqlx::query(
            r#"
            SELECT enrollment_status, payment_completed
            FROM students
            WHERE id = $1
            "#,
        )
        .bind(student_id.to_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            CoreError::Database(format!("Failed to load student enrollment: {e}"))
        })?;

        match row {
            Some(row) => map_enrollment(student_id, &row),
            None => Ok(StudentEnrollment::not_enrolled(student_id)),
        }
    }
}
