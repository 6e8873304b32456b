use crate::ids::{CourseId, LectureId, SectionId};

/// Published structure of a course. Section and lecture order is the order of
/// the vectors.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Course {
    pub id: CourseId,
    pub title: String,
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Section {
    pub id: SectionId,
    pub title: String,
    pub lectures: Vec<Lecture>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Lecture {
    pub id: LectureId,
    pub title: String,
    pub duration_seconds: u32,
}

impl Course {
    pub fn lectures(&self) -> impl Iterator<Item = (&Section, &Lecture)> {
        self.sections.iter().flat_map(|section| {
            section.lectures.iter().map(move |lecture| (section, lecture))
        })
    }

    /// First lecture id that appears more than once, if any.
    pub fn duplicate_lecture(&self) -> Option<LectureId> {
        let mut seen = std::collections::HashSet::new();
        self.lectures()
            .map(|(_, lecture)| lecture.id)
            .find(|id| !seen.insert(*id))
    }
}
