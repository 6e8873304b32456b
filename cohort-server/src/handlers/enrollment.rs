use axum::{Extension, Json, extract::State};
use cohort_core::domain::enrollment::PaymentCallback;
use cohort_model::{
    StudentId,
    api::{
        ApiResponse, CreateOrderRequest, CreateOrderResponse,
        EnrollmentStatusResponse, VerifyPaymentRequest, VerifyPaymentResponse,
    },
};
use tracing::info;

use crate::{
    AppState,
    infra::{errors::AppResult, extract::ApiJson},
};

/// Open a gateway order for the enrollment fee.
pub async fn create_order_handler(
    State(state): State<AppState>,
    Extension(student_id): Extension<StudentId>,
    body: Option<ApiJson<CreateOrderRequest>>,
) -> AppResult<Json<ApiResponse<CreateOrderResponse>>> {
    let ApiJson(request) = body.unwrap_or_default();
    let order = state.orders.issue(student_id, request.course_id).await?;

    Ok(Json(ApiResponse::success(CreateOrderResponse {
        order_id: order.order_id,
        amount: order.amount_minor,
        currency: order.currency,
        key_id: order.key_id,
    })))
}

/// Settle a checkout callback. The signature authenticates the caller, so
/// this route accepts both the student's browser and a gateway relay.
pub async fn verify_payment_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<VerifyPaymentRequest>,
) -> AppResult<Json<ApiResponse<VerifyPaymentResponse>>> {
    let outcome = state
        .verifier
        .verify(&PaymentCallback {
            order_id: request.order_id,
            payment_id: request.payment_id,
            signature: request.signature,
            amount_minor: request.amount,
        })
        .await?;

    if !outcome.newly_verified {
        info!(payment_id = %outcome.payment.id, "verification replayed");
    }

    Ok(Json(ApiResponse::success(VerifyPaymentResponse {
        status: "confirmed".to_string(),
        payment_id: outcome.payment.id,
        enrollment_status: outcome.enrollment.status,
    })))
}

pub async fn enrollment_status_handler(
    State(state): State<AppState>,
    Extension(student_id): Extension<StudentId>,
) -> AppResult<Json<ApiResponse<EnrollmentStatusResponse>>> {
    let overview = state.enrollment.overview(student_id).await?;

    Ok(Json(ApiResponse::success(EnrollmentStatusResponse {
        status: overview.enrollment.status,
        payment_completed: overview.enrollment.payment_completed,
        active_payment: overview.active_payment,
        confirmation: overview.confirmation,
    })))
}
