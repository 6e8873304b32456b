//! Repository ports. Application services depend on these traits only; the
//! PostgreSQL and in-memory adapters implement them with identical
//! invariants.

pub mod admissions;
pub mod completions;
pub mod content;
pub mod identity;
pub mod payments;
pub mod students;
