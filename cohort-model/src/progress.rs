use chrono::{DateTime, Utc};

use crate::ids::{CourseId, LectureId, StudentId};

/// Durable proof that a student finished a lecture. Set-valued per tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct CompletionRecord {
    pub student_id: StudentId,
    pub course_id: CourseId,
    pub lecture_id: LectureId,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct CourseProgress {
    pub completed_count: u32,
    pub total_count: u32,
    pub percentage: u32,
}

impl CourseProgress {
    /// `percentage` is `100 * completed / total` rounded half up, or 0 for an
    /// empty course.
    pub fn compute(completed_count: u32, total_count: u32) -> Self {
        let percentage = if total_count == 0 {
            0
        } else {
            let completed = u64::from(completed_count);
            let total = u64::from(total_count);
            ((200 * completed + total) / (2 * total)) as u32
        };

        Self {
            completed_count,
            total_count,
            percentage,
        }
    }
}
