pub mod admissions;
pub mod completions;
pub mod content;
pub mod identity;
pub mod payments;
pub mod students;

mod rows;
