//! Core data model definitions shared across Cohort crates.
#![allow(missing_docs)]

pub mod admission;
#[cfg(feature = "serde")]
pub mod api;
pub mod content;
pub mod enrollment;
pub mod error;
pub mod identity;
pub mod ids;
pub mod progress;

pub use admission::{
    AdmissionConfirmation, AdmissionDecision, AdmissionFilter, AdmissionPage,
    AdmissionStats, AdmissionStatus,
};
pub use content::{Course, Lecture, Section};
pub use enrollment::{
    EnrollmentStatus, Payment, PaymentStatus, StudentEnrollment,
};
pub use error::{ModelError, Result as ModelResult};
pub use identity::{Identity, Role};
pub use ids::{
    ConfirmationId, CourseId, LectureId, PaymentId, SectionId, StaffId,
    StudentId,
};
pub use progress::{CompletionRecord, CourseProgress};
