//! PostgreSQL infrastructure adapters implementing the database ports.

pub mod repositories;

pub use repositories::admissions::PostgresAdmissionRepository;
pub use repositories::completions::PostgresCompletionRepository;
pub use repositories::content::PostgresCourseContentRepository;
pub use repositories::identity::PostgresIdentityRepository;
pub use repositories::payments::PostgresPaymentRepository;
pub use repositories::students::PostgresStudentRepository;
