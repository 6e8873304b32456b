pub mod admission;
pub mod content;
pub mod enrollment;
pub mod progress;
