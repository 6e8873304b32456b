use std::collections::HashSet;

use async_trait::async_trait;
use cohort_model::{CompletionRecord, CourseId, LectureId, StudentId};

use crate::error::Result;

#[async_trait]
pub trait CompletionRepository: Send + Sync {
    /// Insert the tuple if absent. Returns true when a new record was
    /// written, false when it already existed.
    async fn record_completion(&self, record: &CompletionRecord) -> Result<bool>;

    /// Every lecture the student has completed in the course, including
    /// lectures that have since been retired.
    async fn completed_lectures(
        &self,
        student_id: StudentId,
        course_id: CourseId,
    ) -> Result<HashSet<LectureId>>;
}
