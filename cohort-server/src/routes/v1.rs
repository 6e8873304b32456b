use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::{
    AppState,
    auth::{auth_middleware, require_staff, require_student},
    handlers::{admission, enrollment, progress},
};

/// Create all v1 API routes
pub fn create_v1_router(state: AppState) -> Router<AppState> {
    Router::new()
        // Authenticated by the callback signature, not a session
        .route(
            "/enrollment/verify",
            post(enrollment::verify_payment_handler),
        )
        .merge(create_student_routes(state.clone()))
        .merge(create_staff_routes(state))
}

fn create_student_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/enrollment/order", post(enrollment::create_order_handler))
        .route(
            "/enrollment/status",
            get(enrollment::enrollment_status_handler),
        )
        .route("/progress/complete", post(progress::mark_complete_handler))
        .route("/progress", get(progress::course_progress_handler))
        .route(
            "/courses/{id}/outline",
            get(progress::course_outline_handler),
        )
        // Layers run bottom-up: authenticate, then check the role
        .route_layer(middleware::from_fn(require_student))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

fn create_staff_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admission", get(admission::list_admissions_handler))
        .route("/admission/stats", get(admission::admission_stats_handler))
        .route("/admission/{id}", get(admission::get_admission_handler))
        .route(
            "/admission/{id}/confirm",
            post(admission::confirm_admission_handler),
        )
        .route(
            "/admission/{id}/reject",
            post(admission::reject_admission_handler),
        )
        .route_layer(middleware::from_fn(require_staff))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
