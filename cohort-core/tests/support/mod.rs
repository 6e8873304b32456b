//! Shared wiring for service-level tests: every port backed by one
//! in-memory store and an offline gateway.
#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use cohort_core::{
    crypto::EnrollmentCrypto,
    database::{InMemoryStore, ports::content::CourseContentRepository},
    domain::{
        admission::AdmissionWorkflow,
        content::CourseContentTree,
        enrollment::{
            EnrollmentQuery, IssuedOrder, OrderIssuer, OrderSettings,
            PaymentCallback, PaymentVerifier,
        },
        progress::ProgressTracker,
    },
    gateway::OfflineGateway,
};
use cohort_model::{Course, CourseId, Lecture, LectureId, Section, SectionId};

pub const FEE_MINOR: i64 = 1000;
pub const CURRENCY: &str = "INR";
pub const GATEWAY_SECRET: &str = "gateway-test-secret";
pub const TOKEN_KEY: &str = "token-test-key";

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub gateway: Arc<OfflineGateway>,
    pub crypto: Arc<EnrollmentCrypto>,
    pub requires_confirmation: bool,
    pub orders: OrderIssuer,
    pub verifier: PaymentVerifier,
    pub admissions: AdmissionWorkflow,
    pub enrollment: EnrollmentQuery,
    pub content: CourseContentTree,
    pub progress: ProgressTracker,
}

impl Harness {
    pub fn new() -> Result<Self> {
        Self::build(true)
    }

    pub fn without_confirmation() -> Result<Self> {
        Self::build(false)
    }

    fn build(requires_confirmation: bool) -> Result<Self> {
        let store = Arc::new(InMemoryStore::new());
        let gateway = Arc::new(OfflineGateway::new("key_test"));
        let crypto = Arc::new(EnrollmentCrypto::new(GATEWAY_SECRET, TOKEN_KEY)?);
        let content = CourseContentTree::new(store.clone());

        Ok(Self {
            orders: OrderIssuer::new(
                gateway.clone(),
                store.clone(),
                store.clone(),
                settings(),
            ),
            verifier: PaymentVerifier::new(
                crypto.clone(),
                store.clone(),
                store.clone(),
                requires_confirmation,
            ),
            admissions: AdmissionWorkflow::new(store.clone()),
            enrollment: EnrollmentQuery::new(
                store.clone(),
                store.clone(),
                store.clone(),
            ),
            progress: ProgressTracker::new(content.clone(), store.clone()),
            content,
            store,
            gateway,
            crypto,
            requires_confirmation,
        })
    }

    /// A second issuer over the same store, standing in for another process.
    pub fn sibling_issuer(&self) -> OrderIssuer {
        OrderIssuer::new(
            self.gateway.clone(),
            self.store.clone(),
            self.store.clone(),
            settings(),
        )
    }

    pub fn sibling_verifier(&self) -> PaymentVerifier {
        PaymentVerifier::new(
            self.crypto.clone(),
            self.store.clone(),
            self.store.clone(),
            self.requires_confirmation,
        )
    }

    /// Callback as the gateway would send it after a successful checkout.
    pub fn signed_callback(
        &self,
        order: &IssuedOrder,
        gateway_payment_id: &str,
    ) -> PaymentCallback {
        PaymentCallback {
            order_id: order.order_id.clone(),
            payment_id: gateway_payment_id.to_string(),
            signature: self
                .crypto
                .sign_callback(&order.order_id, gateway_payment_id),
            amount_minor: order.amount_minor,
        }
    }

    /// Publish a course with `lectures` lectures spread over sections of
    /// three.
    pub async fn publish_course(&self, lectures: usize) -> Result<Course> {
        let course = sample_course(lectures);
        self.store.publish_course(&course).await?;
        Ok(course)
    }
}

pub fn settings() -> OrderSettings {
    OrderSettings {
        fee_minor: FEE_MINOR,
        currency: CURRENCY.to_string(),
    }
}

pub fn sample_course(lectures: usize) -> Course {
    let mut sections = Vec::new();
    for chunk in 0..lectures.div_ceil(3) {
        let count = (lectures - chunk * 3).min(3);
        sections.push(Section {
            id: SectionId::new(),
            title: format!("Section {}", chunk + 1),
            lectures: (0..count)
                .map(|i| Lecture {
                    id: LectureId::new(),
                    title: format!("Lecture {}.{}", chunk + 1, i + 1),
                    duration_seconds: 300,
                })
                .collect(),
        });
    }

    Course {
        id: CourseId::new(),
        title: "Systems Programming".to_string(),
        sections,
    }
}

pub fn lecture_ids(course: &Course) -> Vec<LectureId> {
    course.lectures().map(|(_, lecture)| lecture.id).collect()
}
