//! Course content tree: the read-only reference for lecture totals and for
//! the validity of completion marks.

use std::{any::type_name_of_val, collections::HashMap, fmt, sync::Arc};

use cohort_model::{Course, CourseId, LectureId, SectionId};

use crate::{database::ports::content::CourseContentRepository, error::Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineEntry {
    pub index: usize,
    pub section_id: SectionId,
    pub lecture_id: LectureId,
    pub title: String,
    pub duration_seconds: u32,
}

/// A course flattened into play order, with lecture positions indexed once
/// per load so navigation is a constant-time lookup.
#[derive(Debug, Clone)]
pub struct CourseOutline {
    course_id: CourseId,
    title: String,
    entries: Vec<OutlineEntry>,
    positions: HashMap<LectureId, usize>,
}

impl CourseOutline {
    pub fn from_course(course: &Course) -> Self {
        let mut entries = Vec::new();
        let mut positions = HashMap::new();

        for (section, lecture) in course.lectures() {
            // First occurrence wins; publishing rejects duplicates anyway.
            if positions.contains_key(&lecture.id) {
                continue;
            }
            let index = entries.len();
            positions.insert(lecture.id, index);
            entries.push(OutlineEntry {
                index,
                section_id: section.id,
                lecture_id: lecture.id,
                title: lecture.title.clone(),
                duration_seconds: lecture.duration_seconds,
            });
        }

        Self {
            course_id: course.id,
            title: course.title.clone(),
            entries,
            positions,
        }
    }

    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn entries(&self) -> &[OutlineEntry] {
        &self.entries
    }

    pub fn total_lecture_count(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, lecture_id: LectureId) -> bool {
        self.positions.contains_key(&lecture_id)
    }

    pub fn position_of(&self, lecture_id: LectureId) -> Option<usize> {
        self.positions.get(&lecture_id).copied()
    }

    pub fn next_after(&self, lecture_id: LectureId) -> Option<&OutlineEntry> {
        self.position_of(lecture_id)
            .and_then(|index| self.entries.get(index + 1))
    }

    pub fn previous_before(
        &self,
        lecture_id: LectureId,
    ) -> Option<&OutlineEntry> {
        self.position_of(lecture_id)
            .and_then(|index| index.checked_sub(1))
            .and_then(|index| self.entries.get(index))
    }

    pub fn total_duration_seconds(&self) -> u64 {
        self.entries
            .iter()
            .map(|entry| u64::from(entry.duration_seconds))
            .sum()
    }
}

/// Read-side facade over the content repository.
#[derive(Clone)]
pub struct CourseContentTree {
    repository: Arc<dyn CourseContentRepository>,
}

impl fmt::Debug for CourseContentTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CourseContentTree")
            .field("repository", &type_name_of_val(self.repository.as_ref()))
            .finish()
    }
}

impl CourseContentTree {
    pub fn new(repository: Arc<dyn CourseContentRepository>) -> Self {
        Self { repository }
    }

    pub async fn outline(
        &self,
        course_id: CourseId,
    ) -> Result<Option<CourseOutline>> {
        Ok(self
            .repository
            .load_course(course_id)
            .await?
            .map(|course| CourseOutline::from_course(&course)))
    }

    /// Number of live lectures; an unknown course has none.
    pub async fn total_lecture_count(&self, course_id: CourseId) -> Result<usize> {
        Ok(self
            .outline(course_id)
            .await?
            .map_or(0, |outline| outline.total_lecture_count()))
    }

    pub async fn lecture_exists(
        &self,
        course_id: CourseId,
        lecture_id: LectureId,
    ) -> Result<bool> {
        Ok(self
            .outline(course_id)
            .await?
            .is_some_and(|outline| outline.contains(lecture_id)))
    }
}
