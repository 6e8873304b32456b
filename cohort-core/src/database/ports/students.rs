use async_trait::async_trait;
use cohort_model::{StudentEnrollment, StudentId};

use crate::error::Result;

#[async_trait]
pub trait StudentRepository: Send + Sync {
    /// Enrollment view of a student; unknown students are `NotEnrolled`.
    async fn get_enrollment(
        &self,
        student_id: StudentId,
    ) -> Result<StudentEnrollment>;
}
