//! In-process server over the in-memory store and an offline gateway, with
//! helpers that mint sessions the way the auth service would.
#![allow(dead_code)]

use std::{collections::HashMap, sync::Arc};

use anyhow::{Context, Result};
use axum_test::TestServer;
use chrono::{Duration, Utc};
use cohort_core::{
    application::unit_of_work::AppUnitOfWork,
    database::{InMemoryStore, ports::content::CourseContentRepository},
    gateway::OfflineGateway,
};
use cohort_model::{
    Course, CourseId, Identity, Lecture, LectureId, Role, Section, SectionId,
    StaffId, StudentId,
};
use cohort_server::{AppState, create_app, infra::config::Config};
use serde_json::{Value, json};
use uuid::Uuid;

pub const FEE_MINOR: i64 = 1000;

pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub store: Arc<InMemoryStore>,
    pub gateway: Arc<OfflineGateway>,
}

pub fn test_config(requires_confirmation: bool) -> Result<Config> {
    let vars: HashMap<&str, String> = HashMap::from([
        ("AUTH_TOKEN_KEY", "server-test-token-key".to_string()),
        ("GATEWAY_KEY_ID", "key_test".to_string()),
        ("GATEWAY_KEY_SECRET", "server-test-gateway-secret".to_string()),
        ("ENROLLMENT_FEE_MINOR", FEE_MINOR.to_string()),
        ("ENROLLMENT_CURRENCY", "INR".to_string()),
        (
            "ADMISSION_REQUIRES_CONFIRMATION",
            requires_confirmation.to_string(),
        ),
    ]);
    Config::from_lookup(|key| vars.get(key).cloned())
}

impl TestApp {
    pub fn new() -> Result<Self> {
        Self::build(true)
    }

    pub fn without_confirmation() -> Result<Self> {
        Self::build(false)
    }

    fn build(requires_confirmation: bool) -> Result<Self> {
        let store = Arc::new(InMemoryStore::new());
        let gateway = Arc::new(OfflineGateway::new("key_test"));
        let state = AppState::new(
            Arc::new(test_config(requires_confirmation)?),
            Arc::new(AppUnitOfWork::from_memory(store.clone())),
            gateway.clone(),
            None,
        )?;

        let server = TestServer::new(create_app(state.clone()))
            .context("failed to start test server")?;

        Ok(Self {
            server,
            state,
            store,
            gateway,
        })
    }

    async fn session(&self, role: Role, user_id: Uuid) -> String {
        let token = format!("tok_{}", Uuid::new_v4().simple());
        self.store
            .register_session(
                self.state.crypto.hash_token(&token),
                Identity { user_id, role },
                Utc::now() + Duration::hours(1),
            )
            .await;
        token
    }

    /// A fresh student and a bearer token for them.
    pub async fn student(&self) -> (StudentId, String) {
        let id = StudentId::new();
        let token = self.session(Role::Student, id.to_uuid()).await;
        (id, token)
    }

    pub async fn staff(&self) -> (StaffId, String) {
        let id = StaffId::new();
        let token = self.session(Role::Staff, id.to_uuid()).await;
        (id, token)
    }

    /// Create an order for the student and return its `data` payload.
    pub async fn create_order(&self, token: &str) -> Value {
        let response = self
            .server
            .post("/api/v1/enrollment/order")
            .authorization_bearer(token)
            .json(&json!({}))
            .await;
        response.assert_status_ok();
        response.json::<Value>()["data"].clone()
    }

    /// Callback body signed the way the gateway signs it.
    pub fn signed_callback(&self, order: &Value, gateway_payment_id: &str) -> Value {
        let order_id = order["orderId"].as_str().unwrap_or_default();
        json!({
            "orderId": order_id,
            "paymentId": gateway_payment_id,
            "signature": self.state.crypto.sign_callback(order_id, gateway_payment_id),
            "amount": order["amount"],
        })
    }

    /// Order plus verified callback; returns the confirmation id, if any.
    pub async fn enroll(&self, token: &str) -> Option<String> {
        let order = self.create_order(token).await;
        self.server
            .post("/api/v1/enrollment/verify")
            .json(&self.signed_callback(&order, &format!("pay_{}", Uuid::new_v4().simple())))
            .await
            .assert_status_ok();

        let status = self
            .server
            .get("/api/v1/enrollment/status")
            .authorization_bearer(token)
            .await
            .json::<Value>();
        status["data"]["confirmation"]["id"].as_str().map(str::to_string)
    }

    pub async fn publish_course(&self, lectures: usize) -> Result<Course> {
        let course = sample_course(lectures);
        self.store.publish_course(&course).await?;
        Ok(course)
    }
}

pub fn sample_course(lectures: usize) -> Course {
    let mut sections = Vec::new();
    for chunk in 0..lectures.div_ceil(4) {
        let count = (lectures - chunk * 4).min(4);
        sections.push(Section {
            id: SectionId::new(),
            title: format!("Week {}", chunk + 1),
            lectures: (0..count)
                .map(|i| Lecture {
                    id: LectureId::new(),
                    title: format!("Lesson {}.{}", chunk + 1, i + 1),
                    duration_seconds: 600,
                })
                .collect(),
        });
    }

    Course {
        id: CourseId::new(),
        title: "Distributed Systems".to_string(),
        sections,
    }
}

pub fn lecture_ids(course: &Course) -> Vec<LectureId> {
    course.lectures().map(|(_, lecture)| lecture.id).collect()
}
