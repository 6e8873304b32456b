use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use cohort_model::Identity;

use crate::{
    AppState,
    infra::errors::{AppError, AppResult},
};

/// Resolve the bearer token to an [`Identity`] and attach it to the request.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let token_hash = state.crypto.hash_token(extract_bearer_token(&request)?);

    let identity = state
        .unit_of_work
        .identity
        .resolve_token_hash(&token_hash, Utc::now())
        .await?
        .ok_or_else(|| AppError::unauthorized("Invalid or expired session"))?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Must run after [`auth_middleware`]. Exposes the caller as a `StudentId`.
pub async fn require_student(mut request: Request, next: Next) -> AppResult<Response> {
    let student_id = caller(&request)?
        .as_student()
        .ok_or_else(|| AppError::forbidden("Student access required"))?;

    request.extensions_mut().insert(student_id);
    Ok(next.run(request).await)
}

/// Must run after [`auth_middleware`]. Exposes the caller as a `StaffId`.
pub async fn require_staff(mut request: Request, next: Next) -> AppResult<Response> {
    let staff_id = caller(&request)?
        .as_staff()
        .ok_or_else(|| AppError::forbidden("Staff access required"))?;

    request.extensions_mut().insert(staff_id);
    Ok(next.run(request).await)
}

fn caller(request: &Request) -> AppResult<Identity> {
    request
        .extensions()
        .get::<Identity>()
        .copied()
        .ok_or_else(|| AppError::unauthorized("Authentication required"))
}

fn extract_bearer_token(request: &Request) -> AppResult<&str> {
    let header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::unauthorized("Missing bearer token"))?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::unauthorized("Missing bearer token"))
}
