use std::any::type_name_of_val;
use std::fmt;
use std::sync::Arc;

use crate::database::{
    infrastructure::{
        memory::InMemoryStore,
        postgres::{
            PostgresAdmissionRepository, PostgresCompletionRepository,
            PostgresCourseContentRepository, PostgresIdentityRepository,
            PostgresPaymentRepository, PostgresStudentRepository,
        },
    },
    ports::{
        admissions::AdmissionRepository, completions::CompletionRepository,
        content::CourseContentRepository, identity::IdentityRepository,
        payments::PaymentRepository, students::StudentRepository,
    },
    postgres::PostgresDatabase,
};

/// Aggregates all repository ports used by application services.
#[derive(Clone)]
pub struct AppUnitOfWork {
    pub content: Arc<dyn CourseContentRepository>,
    pub completions: Arc<dyn CompletionRepository>,
    pub students: Arc<dyn StudentRepository>,
    pub payments: Arc<dyn PaymentRepository>,
    pub admissions: Arc<dyn AdmissionRepository>,
    pub identity: Arc<dyn IdentityRepository>,
}

impl fmt::Debug for AppUnitOfWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppUnitOfWork")
            .field("content", &type_name_of_val(self.content.as_ref()))
            .field("completions", &type_name_of_val(self.completions.as_ref()))
            .field("students", &type_name_of_val(self.students.as_ref()))
            .field("payments", &type_name_of_val(self.payments.as_ref()))
            .field("admissions", &type_name_of_val(self.admissions.as_ref()))
            .field("identity", &type_name_of_val(self.identity.as_ref()))
            .finish()
    }
}

impl AppUnitOfWork {
    /// Compose all Postgres-backed repositories over one pool.
    pub fn from_postgres(db: &PostgresDatabase) -> Self {
        let pool = db.pool().clone();
        Self {
            content: Arc::new(PostgresCourseContentRepository::new(pool.clone())),
            completions: Arc::new(PostgresCompletionRepository::new(pool.clone())),
            students: Arc::new(PostgresStudentRepository::new(pool.clone())),
            payments: Arc::new(PostgresPaymentRepository::new(pool.clone())),
            admissions: Arc::new(PostgresAdmissionRepository::new(pool.clone())),
            identity: Arc::new(PostgresIdentityRepository::new(pool)),
        }
    }

    /// Every port backed by the same in-memory store.
    pub fn from_memory(store: Arc<InMemoryStore>) -> Self {
        Self {
            content: store.clone(),
            completions: store.clone(),
            students: store.clone(),
            payments: store.clone(),
            admissions: store.clone(),
            identity: store,
        }
    }
}
