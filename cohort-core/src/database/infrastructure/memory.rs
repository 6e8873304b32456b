//! In-memory adapters for every port, used by tests and `--in-memory`
//! development runs.
//!
//! All state sits behind a single async mutex, so each port call is atomic
//! the way a PostgreSQL transaction is. The invariants match the SQL
//! adapters: one active payment per student, compare-and-set on payment and
//! confirmation status, and set-valued completions.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cohort_model::{
    AdmissionConfirmation, AdmissionDecision, AdmissionFilter, AdmissionPage,
    AdmissionStats, AdmissionStatus, CompletionRecord, ConfirmationId, Course,
    CourseId, Identity, LectureId, Payment, PaymentId, PaymentStatus,
    StudentEnrollment, StudentId,
};
use tokio::sync::Mutex;

use crate::database::ports::{
    admissions::{AdmissionRepository, DecisionOutcome, DecisionRecord},
    completions::CompletionRepository,
    content::CourseContentRepository,
    identity::IdentityRepository,
    payments::{
        NewPayment, PaymentInsert, PaymentRepository, Settlement,
        SettlementReceipt,
    },
    students::StudentRepository,
};
use crate::domain::enrollment::state_machine::{
    on_admission_decision, on_payment_verified,
};
use crate::error::{CoreError, Result};

#[derive(Debug, Clone)]
struct SessionRecord {
    identity: Identity,
    expires_at: DateTime<Utc>,
    revoked: bool,
}

#[derive(Debug, Default)]
struct State {
    courses: HashMap<CourseId, Course>,
    completions: HashMap<(StudentId, CourseId, LectureId), DateTime<Utc>>,
    students: HashMap<StudentId, StudentEnrollment>,
    payments: Vec<Payment>,
    confirmations: Vec<AdmissionConfirmation>,
    sessions: HashMap<String, SessionRecord>,
}

impl State {
    fn enrollment(&self, student_id: StudentId) -> StudentEnrollment {
        self.students
            .get(&student_id)
            .copied()
            .unwrap_or_else(|| StudentEnrollment::not_enrolled(student_id))
    }

    fn payment_mut(&mut self, payment_id: PaymentId) -> Option<&mut Payment> {
        self.payments.iter_mut().find(|p| p.id == payment_id)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a session the way the auth service would.
    pub async fn register_session(
        &self,
        token_hash: impl Into<String>,
        identity: Identity,
        expires_at: DateTime<Utc>,
    ) {
        self.state.lock().await.sessions.insert(
            token_hash.into(),
            SessionRecord {
                identity,
                expires_at,
                revoked: false,
            },
        );
    }

    pub async fn revoke_session(&self, token_hash: &str) -> bool {
        match self.state.lock().await.sessions.get_mut(token_hash) {
            Some(session) => {
                session.revoked = true;
                true
            }
            None => false,
        }
    }

    /// Overwrite a student's enrollment row.
    pub async fn seed_enrollment(&self, enrollment: StudentEnrollment) {
        self.state
            .lock()
            .await
            .students
            .insert(enrollment.student_id, enrollment);
    }

    pub async fn payments_for_student(&self, student_id: StudentId) -> Vec<Payment> {
        self.state
            .lock()
            .await
            .payments
            .iter()
            .filter(|p| p.student_id == student_id)
            .cloned()
            .collect()
    }

    pub async fn confirmations_for_student(
        &self,
        student_id: StudentId,
    ) -> Vec<AdmissionConfirmation> {
        self.state
            .lock()
            .await
            .confirmations
            .iter()
            .filter(|c| c.student_id == student_id)
            .cloned()
            .collect()
    }

    pub async fn completion_count(
        &self,
        student_id: StudentId,
        course_id: CourseId,
    ) -> usize {
        self.state
            .lock()
            .await
            .completions
            .keys()
            .filter(|(s, c, _)| *s == student_id && *c == course_id)
            .count()
    }
}

#[async_trait]
impl CourseContentRepository for InMemoryStore {
    async fn load_course(&self, course_id: CourseId) -> Result<Option<Course>> {
        Ok(self.state.lock().await.courses.get(&course_id).cloned())
    }

    async fn publish_course(&self, course: &Course) -> Result<()> {
        if let Some(duplicate) = course.duplicate_lecture() {
            return Err(CoreError::InvalidInput(format!(
                "lecture {duplicate} appears more than once in course {}",
                course.id
            )));
        }
        self.state
            .lock()
            .await
            .courses
            .insert(course.id, course.clone());
        Ok(())
    }

    async fn retire_lecture(
        &self,
        course_id: CourseId,
        lecture_id: LectureId,
    ) -> Result<bool> {
        let mut state = self.state.lock().await;
        let Some(course) = state.courses.get_mut(&course_id) else {
            return Ok(false);
        };

        for section in &mut course.sections {
            let before = section.lectures.len();
            section.lectures.retain(|lecture| lecture.id != lecture_id);
            if section.lectures.len() != before {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[async_trait]
impl CompletionRepository for InMemoryStore {
    async fn record_completion(&self, record: &CompletionRecord) -> Result<bool> {
        let mut state = self.state.lock().await;
        let key = (record.student_id, record.course_id, record.lecture_id);
        if state.completions.contains_key(&key) {
            return Ok(false);
        }
        state.completions.insert(key, record.completed_at);
        Ok(true)
    }

    async fn completed_lectures(
        &self,
        student_id: StudentId,
        course_id: CourseId,
    ) -> Result<HashSet<LectureId>> {
        Ok(self
            .state
            .lock()
            .await
            .completions
            .keys()
            .filter(|(s, c, _)| *s == student_id && *c == course_id)
            .map(|(_, _, lecture)| *lecture)
            .collect())
    }
}

#[async_trait]
impl StudentRepository for InMemoryStore {
    async fn get_enrollment(
        &self,
        student_id: StudentId,
    ) -> Result<StudentEnrollment> {
        Ok(self.state.lock().await.enrollment(student_id))
    }
}

#[async_trait]
impl IdentityRepository for InMemoryStore {
    async fn resolve_token_hash(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Identity>> {
        Ok(self
            .state
            .lock()
            .await
            .sessions
            .get(token_hash)
            .filter(|session| !session.revoked && session.expires_at > now)
            .map(|session| session.identity))
    }
}

#[async_trait]
impl PaymentRepository for InMemoryStore {
    async fn insert_payment(&self, payment: NewPayment) -> Result<PaymentInsert> {
        let mut state = self.state.lock().await;
        if state
            .payments
            .iter()
            .any(|p| p.student_id == payment.student_id && p.active)
        {
            return Ok(PaymentInsert::ActivePaymentExists);
        }
        if state
            .payments
            .iter()
            .any(|p| p.gateway_order_id == payment.gateway_order_id)
        {
            return Err(CoreError::Database(format!(
                "duplicate gateway order id {}",
                payment.gateway_order_id
            )));
        }

        let created = Payment {
            id: PaymentId::new(),
            student_id: payment.student_id,
            course_id: payment.course_id,
            amount_minor: payment.amount_minor,
            currency: payment.currency,
            gateway_order_id: payment.gateway_order_id,
            gateway_payment_id: None,
            status: PaymentStatus::Created,
            active: true,
            failure_reason: None,
            created_at: payment.created_at,
            settled_at: None,
        };
        state.payments.push(created.clone());
        Ok(PaymentInsert::Created(created))
    }

    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<Payment>> {
        Ok(self
            .state
            .lock()
            .await
            .payments
            .iter()
            .find(|p| p.gateway_order_id == order_id)
            .cloned())
    }

    async fn find_active_for_student(
        &self,
        student_id: StudentId,
    ) -> Result<Option<Payment>> {
        Ok(self
            .state
            .lock()
            .await
            .payments
            .iter()
            .find(|p| p.student_id == student_id && p.active)
            .cloned())
    }

    async fn mark_failed(
        &self,
        payment_id: PaymentId,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut state = self.state.lock().await;
        match state.payment_mut(payment_id) {
            Some(payment) if payment.status == PaymentStatus::Created => {
                payment.status = PaymentStatus::Failed;
                payment.active = false;
                payment.failure_reason = Some(reason.to_string());
                payment.settled_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn settle_verified(
        &self,
        settlement: &Settlement,
    ) -> Result<Option<SettlementReceipt>> {
        let mut state = self.state.lock().await;

        let payment = match state.payment_mut(settlement.payment_id) {
            Some(payment) if payment.status == PaymentStatus::Created => {
                payment.status = PaymentStatus::Verified;
                payment.gateway_payment_id =
                    Some(settlement.gateway_payment_id.clone());
                payment.settled_at = Some(settlement.settled_at);
                payment.clone()
            }
            _ => return Ok(None),
        };

        let current = state.enrollment(payment.student_id);
        let transition = on_payment_verified(
            current.status,
            settlement.requires_confirmation,
        );
        let enrollment = StudentEnrollment {
            student_id: payment.student_id,
            status: transition.target(current.status),
            payment_completed: true,
        };
        state.students.insert(payment.student_id, enrollment);

        let confirmation = transition.opens_confirmation().then(|| {
            AdmissionConfirmation {
                id: ConfirmationId::new(),
                student_id: payment.student_id,
                course_id: payment.course_id,
                payment_id: payment.id,
                status: AdmissionStatus::Pending,
                rejection_reason: None,
                notes: None,
                decided_by: None,
                decided_at: None,
                created_at: settlement.settled_at,
                gateway_order_id: payment.gateway_order_id.clone(),
                gateway_payment_id: payment.gateway_payment_id.clone(),
            }
        });
        if let Some(confirmation) = &confirmation {
            state.confirmations.push(confirmation.clone());
        }

        Ok(Some(SettlementReceipt {
            payment,
            transition,
            enrollment,
            confirmation,
        }))
    }
}

#[async_trait]
impl AdmissionRepository for InMemoryStore {
    async fn get(
        &self,
        confirmation_id: ConfirmationId,
    ) -> Result<Option<AdmissionConfirmation>> {
        Ok(self
            .state
            .lock()
            .await
            .confirmations
            .iter()
            .find(|c| c.id == confirmation_id)
            .cloned())
    }

    async fn latest_for_student(
        &self,
        student_id: StudentId,
    ) -> Result<Option<AdmissionConfirmation>> {
        Ok(self
            .state
            .lock()
            .await
            .confirmations
            .iter()
            .filter(|c| c.student_id == student_id)
            .max_by_key(|c| (c.created_at, c.id))
            .cloned())
    }

    async fn decide(&self, record: &DecisionRecord) -> Result<DecisionOutcome> {
        let mut state = self.state.lock().await;

        let Some(index) = state
            .confirmations
            .iter()
            .position(|c| c.id == record.confirmation_id)
        else {
            return Ok(DecisionOutcome::NotFound);
        };

        let snapshot = state.confirmations[index].clone();
        if snapshot.status != AdmissionStatus::Pending {
            return Ok(DecisionOutcome::NotPending(snapshot));
        }

        let current = state.enrollment(snapshot.student_id);
        let next = match on_admission_decision(current.status, &record.decision)
        {
            Ok(next) => next,
            Err(conflict) => {
                return Ok(DecisionOutcome::StudentConflict {
                    confirmation: snapshot,
                    status: conflict.from,
                });
            }
        };

        let enrollment = StudentEnrollment {
            status: next,
            ..current
        };
        state.students.insert(snapshot.student_id, enrollment);

        if let AdmissionDecision::Reject { .. } = record.decision
            && let Some(payment) = state.payment_mut(snapshot.payment_id)
        {
            payment.active = false;
        }

        let confirmation = &mut state.confirmations[index];
        confirmation.status = record.decision.target_status();
        confirmation.rejection_reason =
            record.decision.rejection_reason().map(str::to_string);
        confirmation.notes = record.decision.notes().map(str::to_string);
        confirmation.decided_by = Some(record.staff_id);
        confirmation.decided_at = Some(record.decided_at);

        Ok(DecisionOutcome::Decided {
            confirmation: confirmation.clone(),
            enrollment,
        })
    }

    async fn list(&self, filter: &AdmissionFilter) -> Result<AdmissionPage> {
        let state = self.state.lock().await;
        let mut matching: Vec<&AdmissionConfirmation> = state
            .confirmations
            .iter()
            .filter(|c| filter.matches(c))
            .collect();
        matching.sort_by(|a, b| {
            (b.created_at, b.id).cmp(&(a.created_at, a.id))
        });

        let total = matching.len() as u64;
        let offset = usize::try_from(filter.offset()).unwrap_or(usize::MAX);
        let items = matching
            .into_iter()
            .skip(offset)
            .take(filter.limit as usize)
            .cloned()
            .collect();

        Ok(AdmissionPage {
            items,
            total,
            page: filter.page,
            limit: filter.limit,
        })
    }

    async fn stats(&self) -> Result<AdmissionStats> {
        let state = self.state.lock().await;
        let mut stats = AdmissionStats::default();
        for confirmation in &state.confirmations {
            stats.record(confirmation.status);
        }
        Ok(stats)
    }
}
