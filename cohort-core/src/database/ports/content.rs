use async_trait::async_trait;
use cohort_model::{Course, CourseId, LectureId};

use crate::error::Result;

#[async_trait]
pub trait CourseContentRepository: Send + Sync {
    /// Current published structure of a course. Retired sections and
    /// lectures are omitted.
    async fn load_course(&self, course_id: CourseId) -> Result<Option<Course>>;

    /// Publish (or republish) a course tree. Lectures that were published
    /// before but are absent from `course` are retired, never deleted.
    async fn publish_course(&self, course: &Course) -> Result<()>;

    /// Retire a single lecture. Returns false if it was not live.
    async fn retire_lecture(
        &self,
        course_id: CourseId,
        lecture_id: LectureId,
    ) -> Result<bool>;
}
