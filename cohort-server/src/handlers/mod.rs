pub mod admission;
pub mod enrollment;
pub mod health;
pub mod progress;
