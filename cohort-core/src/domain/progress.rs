//! Lecture completion tracking. Progress is always recomputed from the
//! completion set and the current outline, never kept as a counter.

use std::{any::type_name_of_val, collections::HashSet, fmt, sync::Arc};

use chrono::Utc;
use cohort_model::{
    CompletionRecord, CourseId, CourseProgress, LectureId, StudentId,
};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    database::ports::completions::CompletionRepository,
    domain::content::{CourseContentTree, CourseOutline},
    error::CoreError,
};

#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("lecture {lecture_id} is not part of course {course_id}")]
    UnknownLecture {
        course_id: CourseId,
        lecture_id: LectureId,
    },
    #[error("course {0} does not exist")]
    UnknownCourse(CourseId),
    #[error(transparent)]
    Storage(#[from] CoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkCompleteOutcome {
    /// False when the lecture had already been completed.
    pub newly_completed: bool,
    pub progress: CourseProgress,
}

/// Outline annotated with one student's completion state.
#[derive(Debug, Clone)]
pub struct OutlineProgress {
    pub outline: CourseOutline,
    pub completed: HashSet<LectureId>,
    pub progress: CourseProgress,
    /// First lecture in play order not yet completed.
    pub next_lecture: Option<LectureId>,
}

/// Where one lecture sits in play order, with its neighbours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LecturePosition {
    pub lecture_id: LectureId,
    pub index: usize,
    pub previous: Option<LectureId>,
    pub next: Option<LectureId>,
    pub completed: bool,
}

impl OutlineProgress {
    /// Neighbours of `lecture_id`, or `None` when it is not a live lecture
    /// of this course.
    pub fn position(&self, lecture_id: LectureId) -> Option<LecturePosition> {
        let index = self.outline.position_of(lecture_id)?;
        Some(LecturePosition {
            lecture_id,
            index,
            previous: self
                .outline
                .previous_before(lecture_id)
                .map(|entry| entry.lecture_id),
            next: self
                .outline
                .next_after(lecture_id)
                .map(|entry| entry.lecture_id),
            completed: self.completed.contains(&lecture_id),
        })
    }
}

#[derive(Clone)]
pub struct ProgressTracker {
    content: CourseContentTree,
    completions: Arc<dyn CompletionRepository>,
}

impl fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("content", &self.content)
            .field("completions", &type_name_of_val(self.completions.as_ref()))
            .finish()
    }
}

impl ProgressTracker {
    pub fn new(
        content: CourseContentTree,
        completions: Arc<dyn CompletionRepository>,
    ) -> Self {
        Self {
            content,
            completions,
        }
    }

    pub async fn mark_complete(
        &self,
        student_id: StudentId,
        course_id: CourseId,
        lecture_id: LectureId,
    ) -> Result<MarkCompleteOutcome, ProgressError> {
        let unknown = ProgressError::UnknownLecture {
            course_id,
            lecture_id,
        };
        let Some(outline) = self.content.outline(course_id).await? else {
            return Err(unknown);
        };
        if !outline.contains(lecture_id) {
            return Err(unknown);
        }

        let newly_completed = self
            .completions
            .record_completion(&CompletionRecord {
                student_id,
                course_id,
                lecture_id,
                completed_at: Utc::now(),
            })
            .await?;

        if newly_completed {
            info!(%student_id, %course_id, %lecture_id, "lecture completed");
        } else {
            debug!(%student_id, %lecture_id, "lecture already completed");
        }

        let completed = self
            .completions
            .completed_lectures(student_id, course_id)
            .await?;

        Ok(MarkCompleteOutcome {
            newly_completed,
            progress: measure(&outline, &completed),
        })
    }

    pub async fn progress(
        &self,
        student_id: StudentId,
        course_id: CourseId,
    ) -> Result<CourseProgress, ProgressError> {
        Ok(self.outline_with_progress(student_id, course_id).await?.progress)
    }

    pub async fn outline_with_progress(
        &self,
        student_id: StudentId,
        course_id: CourseId,
    ) -> Result<OutlineProgress, ProgressError> {
        let outline = self
            .content
            .outline(course_id)
            .await?
            .ok_or(ProgressError::UnknownCourse(course_id))?;

        let completed: HashSet<LectureId> = self
            .completions
            .completed_lectures(student_id, course_id)
            .await?
            .into_iter()
            .filter(|lecture_id| outline.contains(*lecture_id))
            .collect();

        let progress = measure(&outline, &completed);
        let next_lecture = outline
            .entries()
            .iter()
            .find(|entry| !completed.contains(&entry.lecture_id))
            .map(|entry| entry.lecture_id);

        Ok(OutlineProgress {
            outline,
            completed,
            progress,
            next_lecture,
        })
    }
}

/// Records for retired lectures are inert: only ids still in the outline
/// count, so `completed_count <= total_count` holds by construction.
fn measure(
    outline: &CourseOutline,
    completed: &HashSet<LectureId>,
) -> CourseProgress {
    let completed_count = completed
        .iter()
        .filter(|lecture_id| outline.contains(**lecture_id))
        .count();

    CourseProgress::compute(
        u32::try_from(completed_count).unwrap_or(u32::MAX),
        u32::try_from(outline.total_lecture_count()).unwrap_or(u32::MAX),
    )
}
