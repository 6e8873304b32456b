use std::{fmt, sync::Arc};

use anyhow::Context;
use cohort_core::{
    application::unit_of_work::AppUnitOfWork,
    crypto::EnrollmentCrypto,
    database::PostgresDatabase,
    domain::{
        admission::AdmissionWorkflow,
        content::CourseContentTree,
        enrollment::{EnrollmentQuery, OrderIssuer, OrderSettings, PaymentVerifier},
        progress::ProgressTracker,
    },
    gateway::PaymentGateway,
};

use crate::infra::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub unit_of_work: Arc<AppUnitOfWork>,
    /// Absent when running against the in-memory store.
    pub postgres: Option<Arc<PostgresDatabase>>,
    pub config: Arc<Config>,
    pub crypto: Arc<EnrollmentCrypto>,
    pub orders: Arc<OrderIssuer>,
    pub verifier: Arc<PaymentVerifier>,
    pub enrollment: Arc<EnrollmentQuery>,
    pub admissions: Arc<AdmissionWorkflow>,
    pub progress: Arc<ProgressTracker>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

impl AppState {
    /// Wire every service over one set of repository ports.
    pub fn new(
        config: Arc<Config>,
        unit_of_work: Arc<AppUnitOfWork>,
        gateway: Arc<dyn PaymentGateway>,
        postgres: Option<Arc<PostgresDatabase>>,
    ) -> anyhow::Result<Self> {
        let crypto = Arc::new(
            EnrollmentCrypto::new(
                config.gateway.key_secret.as_bytes(),
                config.auth_token_key.as_bytes(),
            )
            .context("invalid enrollment secrets")?,
        );

        let uow = &unit_of_work;
        let requires_confirmation = config.enrollment.requires_confirmation;
        let content = CourseContentTree::new(uow.content.clone());

        Ok(Self {
            orders: Arc::new(OrderIssuer::new(
                gateway,
                uow.payments.clone(),
                uow.students.clone(),
                OrderSettings {
                    fee_minor: config.enrollment.fee_minor,
                    currency: config.enrollment.currency.clone(),
                },
            )),
            verifier: Arc::new(PaymentVerifier::new(
                crypto.clone(),
                uow.payments.clone(),
                uow.students.clone(),
                requires_confirmation,
            )),
            enrollment: Arc::new(EnrollmentQuery::new(
                uow.students.clone(),
                uow.payments.clone(),
                uow.admissions.clone(),
            )),
            admissions: Arc::new(AdmissionWorkflow::new(uow.admissions.clone())),
            progress: Arc::new(ProgressTracker::new(
                content,
                uow.completions.clone(),
            )),
            crypto,
            postgres,
            config,
            unit_of_work,
        })
    }
}
