//! PostgreSQL adapter behaviour. Needs `DATABASE_URL` pointing at a server
//! where `#[sqlx::test]` may create scratch databases:
//!
//! ```text
//! cargo test -p cohort-core --features postgres-tests --test postgres_repositories
//! ```
#![cfg(feature = "postgres-tests")]

use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, Utc};
use cohort_core::{
    application::AppUnitOfWork,
    crypto::EnrollmentCrypto,
    database::{
        PostgresDatabase,
        ports::payments::{NewPayment, PaymentInsert, Settlement},
    },
    domain::{
        admission::{AdmissionError, AdmissionWorkflow},
        content::CourseContentTree,
        enrollment::{OrderError, OrderIssuer, PaymentVerifier},
        progress::ProgressTracker,
    },
    gateway::OfflineGateway,
};
use cohort_model::{
    AdmissionFilter, AdmissionStatus, CompletionRecord, EnrollmentStatus,
    PaymentStatus, Role, StaffId, StudentId,
};
use futures::future::join_all;
use sqlx::PgPool;

#[path = "support/mod.rs"]
mod support;
use support::{GATEWAY_SECRET, TOKEN_KEY, lecture_ids, sample_course, settings};

fn uow(pool: PgPool) -> AppUnitOfWork {
    AppUnitOfWork::from_postgres(&PostgresDatabase::from_pool(pool))
}

fn new_payment(student_id: StudentId, order: &str) -> NewPayment {
    NewPayment {
        student_id,
        course_id: None,
        amount_minor: 1000,
        currency: "INR".into(),
        gateway_order_id: order.into(),
        created_at: Utc::now(),
    }
}

#[sqlx::test(migrator = "cohort_core::MIGRATOR")]
async fn partial_index_allows_one_active_payment(pool: PgPool) -> Result<()> {
    let uow = uow(pool);
    let student = StudentId::new();

    let first = uow.payments.insert_payment(new_payment(student, "order_a")).await?;
    let PaymentInsert::Created(first) = first else {
        panic!("first insert should succeed");
    };
    assert!(first.active);
    assert_eq!(first.status, PaymentStatus::Created);

    let second = uow.payments.insert_payment(new_payment(student, "order_b")).await?;
    assert!(matches!(second, PaymentInsert::ActivePaymentExists));

    assert!(uow.payments.mark_failed(first.id, "signature mismatch", Utc::now()).await?);
    assert!(!uow.payments.mark_failed(first.id, "again", Utc::now()).await?);

    let third = uow.payments.insert_payment(new_payment(student, "order_c")).await?;
    assert!(matches!(third, PaymentInsert::Created(_)));
    Ok(())
}

#[sqlx::test(migrator = "cohort_core::MIGRATOR")]
async fn settlement_applies_transition_atomically(pool: PgPool) -> Result<()> {
    let uow = uow(pool);
    let student = StudentId::new();
    let PaymentInsert::Created(payment) =
        uow.payments.insert_payment(new_payment(student, "order_a")).await?
    else {
        panic!("insert should succeed");
    };

    let settlement = Settlement {
        payment_id: payment.id,
        gateway_payment_id: "pay_1".into(),
        settled_at: Utc::now(),
        requires_confirmation: true,
    };
    let receipt = uow
        .payments
        .settle_verified(&settlement)
        .await?
        .expect("first settlement wins");
    assert_eq!(receipt.enrollment.status, EnrollmentStatus::Pending);
    assert!(receipt.enrollment.payment_completed);

    assert!(uow.payments.settle_verified(&settlement).await?.is_none());

    let enrollment = uow.students.get_enrollment(student).await?;
    assert_eq!(enrollment, receipt.enrollment);

    let confirmation = uow
        .admissions
        .latest_for_student(student)
        .await?
        .expect("confirmation stored");
    assert_eq!(Some(confirmation.id), receipt.confirmation.map(|c| c.id));
    assert_eq!(confirmation.gateway_payment_id.as_deref(), Some("pay_1"));
    Ok(())
}

#[sqlx::test(migrator = "cohort_core::MIGRATOR")]
async fn concurrent_issuers_share_one_slot(pool: PgPool) -> Result<()> {
    let uow = uow(pool);
    let gateway = Arc::new(OfflineGateway::new("key_test"));
    let student = StudentId::new();

    let issuers: Vec<_> = (0..4)
        .map(|_| {
            OrderIssuer::new(
                gateway.clone(),
                uow.payments.clone(),
                uow.students.clone(),
                settings(),
            )
        })
        .collect();

    let results =
        join_all(issuers.iter().map(|issuer| issuer.issue(student, None))).await;
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results.iter().all(|r| matches!(
        r,
        Ok(_) | Err(OrderError::DuplicateOrderInFlight { .. })
    )));
    Ok(())
}

#[sqlx::test(migrator = "cohort_core::MIGRATOR")]
async fn decisions_are_compare_and_set(pool: PgPool) -> Result<()> {
    let uow = uow(pool);
    let gateway = Arc::new(OfflineGateway::new("key_test"));
    let crypto = Arc::new(EnrollmentCrypto::new(GATEWAY_SECRET, TOKEN_KEY)?);
    let issuer = OrderIssuer::new(
        gateway,
        uow.payments.clone(),
        uow.students.clone(),
        settings(),
    );
    let verifier =
        PaymentVerifier::new(crypto.clone(), uow.payments.clone(), uow.students.clone(), true);
    let workflow = AdmissionWorkflow::new(uow.admissions.clone());

    let student = StudentId::new();
    let order = issuer.issue(student, None).await?;
    let callback = cohort_core::domain::enrollment::PaymentCallback {
        order_id: order.order_id.clone(),
        payment_id: "pay_pg_1".into(),
        signature: crypto.sign_callback(&order.order_id, "pay_pg_1"),
        amount_minor: order.amount_minor,
    };
    let confirmation = verifier
        .verify(&callback)
        .await?
        .confirmation
        .expect("confirmation opened");

    let decided = workflow
        .reject(confirmation.id, StaffId::new(), "incomplete documents", None)
        .await?;
    assert_eq!(decided.enrollment.status, EnrollmentStatus::Rejected);

    let err = workflow
        .confirm(confirmation.id, StaffId::new(), None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AdmissionError::InvalidState {
            status: AdmissionStatus::Rejected
        }
    ));

    // Rejection released the slot.
    assert!(uow.payments.find_active_for_student(student).await?.is_none());
    issuer.issue(student, None).await?;

    let page = workflow
        .list(AdmissionFilter {
            search: Some("PAY_PG".into()),
            ..AdmissionFilter::default()
        })
        .await?;
    assert_eq!(page.total, 1);
    let stats = workflow.stats().await?;
    assert_eq!((stats.rejected, stats.total), (1, 1));
    Ok(())
}

#[sqlx::test(migrator = "cohort_core::MIGRATOR")]
async fn content_publish_and_retire_round_trip(pool: PgPool) -> Result<()> {
    let uow = uow(pool);
    let course = sample_course(5);
    let lectures = lecture_ids(&course);
    uow.content.publish_course(&course).await?;

    let loaded = uow.content.load_course(course.id).await?.expect("course stored");
    assert_eq!(loaded, course);

    let student = StudentId::new();
    let tracker = ProgressTracker::new(
        CourseContentTree::new(uow.content.clone()),
        uow.completions.clone(),
    );
    for lecture in &lectures[..2] {
        tracker.mark_complete(student, course.id, *lecture).await?;
    }
    assert!(
        !uow.completions
            .record_completion(&CompletionRecord {
                student_id: student,
                course_id: course.id,
                lecture_id: lectures[0],
                completed_at: Utc::now(),
            })
            .await?
    );

    // Republishing without the first lecture retires it.
    let mut trimmed = course.clone();
    trimmed.sections[0].lectures.remove(0);
    uow.content.publish_course(&trimmed).await?;

    let progress = tracker.progress(student, course.id).await?;
    assert_eq!((progress.completed_count, progress.total_count), (1, 4));
    assert_eq!(uow.completions.completed_lectures(student, course.id).await?.len(), 2);
    Ok(())
}

#[sqlx::test(migrator = "cohort_core::MIGRATOR")]
async fn concurrent_completions_insert_one_row(pool: PgPool) -> Result<()> {
    let uow = uow(pool.clone());
    let course = sample_course(4);
    let lecture = lecture_ids(&course)[1];
    uow.content.publish_course(&course).await?;

    let student = StudentId::new();
    let tracker = Arc::new(ProgressTracker::new(
        CourseContentTree::new(uow.content.clone()),
        uow.completions.clone(),
    ));
    let attempts = (0..8).map(|_| {
        let tracker = tracker.clone();
        let course_id = course.id;
        tokio::spawn(async move {
            tracker.mark_complete(student, course_id, lecture).await
        })
    });
    let mut outcomes = Vec::new();
    for joined in join_all(attempts).await {
        outcomes.push(joined.expect("task panicked")?);
    }

    assert_eq!(outcomes.iter().filter(|o| o.newly_completed).count(), 1);
    assert!(outcomes.iter().all(|o| o.progress.completed_count == 1));

    let rows: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM course_completions WHERE student_id = $1 AND lecture_id = $2",
    )
    .bind(student.to_uuid())
    .bind(lecture.to_uuid())
    .fetch_one(&pool)
    .await?;
    assert_eq!(rows, 1);
    Ok(())
}

#[sqlx::test(migrator = "cohort_core::MIGRATOR")]
async fn completed_lectures_cannot_be_hard_deleted(pool: PgPool) -> Result<()> {
    let uow = uow(pool.clone());
    let course = sample_course(3);
    let lecture = lecture_ids(&course)[0];
    uow.content.publish_course(&course).await?;

    let student = StudentId::new();
    ProgressTracker::new(
        CourseContentTree::new(uow.content.clone()),
        uow.completions.clone(),
    )
    .mark_complete(student, course.id, lecture)
    .await?;

    let deleted = sqlx::query("DELETE FROM course_lectures WHERE id = $1")
        .bind(lecture.to_uuid())
        .execute(&pool)
        .await;
    let err = deleted.expect_err("completion row must block the delete");
    let code = err
        .as_database_error()
        .and_then(|db| db.code())
        .map(|code| code.into_owned());
    assert_eq!(code.as_deref(), Some("23503"));

    assert_eq!(uow.completions.completed_lectures(student, course.id).await?.len(), 1);
    Ok(())
}

#[sqlx::test(migrator = "cohort_core::MIGRATOR")]
async fn sessions_resolve_until_expiry(pool: PgPool) -> Result<()> {
    let uow = uow(pool.clone());
    let crypto = EnrollmentCrypto::new(GATEWAY_SECRET, TOKEN_KEY)?;
    let user_id = uuid::Uuid::new_v4();
    let hash = crypto.hash_token("opaque-token");

    sqlx::query(
        "INSERT INTO auth_sessions (token_hash, user_id, role, expires_at) VALUES ($1, $2, 'staff', $3)",
    )
    .bind(&hash)
    .bind(user_id)
    .bind(Utc::now() + Duration::hours(1))
    .execute(&pool)
    .await?;

    let identity = uow
        .identity
        .resolve_token_hash(&hash, Utc::now())
        .await?
        .expect("session resolves");
    assert_eq!(identity.role, Role::Staff);
    assert_eq!(identity.user_id, user_id);

    assert!(
        uow.identity
            .resolve_token_hash(&hash, Utc::now() + Duration::hours(2))
            .await?
            .is_none()
    );
    Ok(())
}
