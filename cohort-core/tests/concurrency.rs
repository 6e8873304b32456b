//! Races the services must survive: parallel order creation, duplicate
//! callbacks, competing staff decisions and repeated completions.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cohort_core::{
    database::{
        InMemoryStore,
        ports::payments::{
            NewPayment, PaymentInsert, PaymentRepository, Settlement,
            SettlementReceipt,
        },
    },
    domain::{
        admission::AdmissionError,
        enrollment::{OrderError, PaymentVerifier, VerificationError},
    },
};
use cohort_model::{
    AdmissionStatus, EnrollmentStatus, Payment, PaymentId, PaymentStatus, StaffId,
    StudentId,
};
use futures::future::join_all;

#[path = "support/mod.rs"]
mod support;
use support::Harness;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_orders_leave_one_active_payment() -> Result<()> {
    let harness = Arc::new(Harness::new()?);
    let student = StudentId::new();

    let attempts = (0..16).map(|_| {
        let harness = harness.clone();
        tokio::spawn(async move { harness.orders.issue(student, None).await })
    });
    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    let issued = results.iter().filter(|r| r.is_ok()).count();
    let duplicates = results
        .iter()
        .filter(|r| matches!(r, Err(OrderError::DuplicateOrderInFlight { .. })))
        .count();
    assert_eq!(issued, 1);
    assert_eq!(duplicates, 15);

    // The per-student lock keeps losers from reaching the gateway at all.
    assert_eq!(harness.gateway.orders_created(), 1);

    let active: Vec<_> = harness
        .store
        .payments_for_student(student)
        .await
        .into_iter()
        .filter(|p| p.active)
        .collect();
    assert_eq!(active.len(), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn issuers_in_separate_processes_still_leave_one_active_payment() -> Result<()> {
    let harness = Harness::new()?;
    let sibling = harness.sibling_issuer();
    let student = StudentId::new();

    let (left, right) = tokio::join!(
        harness.orders.issue(student, None),
        sibling.issue(student, None)
    );

    let outcomes = [left, right];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes.iter().any(|r| matches!(
        r,
        Err(OrderError::DuplicateOrderInFlight { .. })
    )));

    let active = harness
        .store
        .payments_for_student(student)
        .await
        .into_iter()
        .filter(|p| p.active)
        .count();
    assert_eq!(active, 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn duplicate_callbacks_transition_once() -> Result<()> {
    let harness = Harness::new()?;
    let sibling = harness.sibling_verifier();
    let student = StudentId::new();
    let order = harness.orders.issue(student, None).await?;
    let callback = harness.signed_callback(&order, "pay_001");

    let (a, b, c) = tokio::join!(
        harness.verifier.verify(&callback),
        harness.verifier.verify(&callback),
        sibling.verify(&callback)
    );
    let outcomes = [a?, b?, c?];

    assert!(outcomes.iter().all(|o| o.payment.status == PaymentStatus::Verified));
    assert_eq!(outcomes.iter().filter(|o| o.newly_verified).count(), 1);
    assert!(outcomes.iter().all(|o| o.enrollment.status == EnrollmentStatus::Pending));
    assert_eq!(harness.store.confirmations_for_student(student).await.len(), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn competing_decisions_have_one_winner() -> Result<()> {
    let harness = Harness::new()?;
    let student = StudentId::new();
    let order = harness.orders.issue(student, None).await?;
    let confirmation = harness
        .verifier
        .verify(&harness.signed_callback(&order, "pay_001"))
        .await?
        .confirmation
        .expect("confirmation opened");

    let (confirmed, rejected) = tokio::join!(
        harness.admissions.confirm(confirmation.id, StaffId::new(), None),
        harness
            .admissions
            .reject(confirmation.id, StaffId::new(), "not eligible", None)
    );

    let winner = match (&confirmed, &rejected) {
        (Ok(decided), Err(AdmissionError::InvalidState { .. }))
        | (Err(AdmissionError::InvalidState { .. }), Ok(decided)) => decided,
        other => panic!("expected exactly one decision to land: {other:?}"),
    };

    let stored = harness.admissions.get(confirmation.id).await?;
    assert_eq!(stored.status, winner.confirmation.status);
    assert_ne!(stored.status, AdmissionStatus::Pending);

    let overview = harness.enrollment.overview(student).await?;
    assert_eq!(overview.enrollment.status, winner.enrollment.status);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn repeated_completions_record_once() -> Result<()> {
    let harness = Arc::new(Harness::new()?);
    let student = StudentId::new();
    let course = harness.publish_course(5).await?;
    let lecture = support::lecture_ids(&course)[2];

    let attempts = (0..12).map(|_| {
        let harness = harness.clone();
        let course_id = course.id;
        tokio::spawn(async move {
            harness.progress.mark_complete(student, course_id, lecture).await
        })
    });
    let mut outcomes = Vec::new();
    for joined in join_all(attempts).await {
        outcomes.push(joined.expect("task panicked")?);
    }

    assert_eq!(outcomes.iter().filter(|o| o.newly_completed).count(), 1);
    assert!(outcomes.iter().all(|o| o.progress.completed_count == 1));
    assert_eq!(harness.store.completion_count(student, course.id).await, 1);

    let progress = harness.progress.progress(student, course.id).await?;
    assert_eq!(progress.completed_count, 1);
    assert_eq!(progress.total_count, 5);
    Ok(())
}

/// Payment store where another process settles the payment in the window
/// between this process reading it and trying to fail it.
struct SettledBeforeFailing {
    inner: Arc<InMemoryStore>,
    lost: AtomicUsize,
}

#[async_trait]
impl PaymentRepository for SettledBeforeFailing {
    async fn insert_payment(
        &self,
        payment: NewPayment,
    ) -> cohort_core::Result<PaymentInsert> {
        self.inner.insert_payment(payment).await
    }

    async fn find_by_order_id(
        &self,
        order_id: &str,
    ) -> cohort_core::Result<Option<Payment>> {
        self.inner.find_by_order_id(order_id).await
    }

    async fn find_active_for_student(
        &self,
        student_id: StudentId,
    ) -> cohort_core::Result<Option<Payment>> {
        self.inner.find_active_for_student(student_id).await
    }

    async fn mark_failed(
        &self,
        payment_id: PaymentId,
        reason: &str,
        at: DateTime<Utc>,
    ) -> cohort_core::Result<bool> {
        self.inner
            .settle_verified(&Settlement {
                payment_id,
                gateway_payment_id: "pay_sibling".to_string(),
                settled_at: at,
                requires_confirmation: true,
            })
            .await?;
        let moved = self.inner.mark_failed(payment_id, reason, at).await?;
        if !moved {
            self.lost.fetch_add(1, Ordering::SeqCst);
        }
        Ok(moved)
    }

    async fn settle_verified(
        &self,
        settlement: &Settlement,
    ) -> cohort_core::Result<Option<SettlementReceipt>> {
        self.inner.settle_verified(settlement).await
    }
}

#[tokio::test]
async fn bad_callback_losing_to_a_settlement_keeps_the_payment_verified() -> Result<()> {
    let harness = Harness::new()?;
    let payments = Arc::new(SettledBeforeFailing {
        inner: harness.store.clone(),
        lost: AtomicUsize::new(0),
    });
    let verifier = PaymentVerifier::new(
        harness.crypto.clone(),
        payments.clone(),
        harness.store.clone(),
        true,
    );
    let student = StudentId::new();
    let order = harness.orders.issue(student, None).await?;

    let mut callback = harness.signed_callback(&order, "pay_forged");
    callback.signature = "0".repeat(64);

    let result = verifier.verify(&callback).await;
    assert!(matches!(
        result,
        Err(VerificationError::VerificationFailed { .. })
    ));
    assert_eq!(payments.lost.load(Ordering::SeqCst), 1);

    let stored = harness
        .store
        .find_by_order_id(&order.order_id)
        .await?
        .expect("payment stored");
    assert_eq!(stored.status, PaymentStatus::Verified);
    assert_eq!(stored.gateway_payment_id.as_deref(), Some("pay_sibling"));

    let overview = harness.enrollment.overview(student).await?;
    assert_eq!(overview.enrollment.status, EnrollmentStatus::Pending);
    assert_eq!(harness.store.confirmations_for_student(student).await.len(), 1);
    Ok(())
}
