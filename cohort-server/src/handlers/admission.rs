use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use cohort_model::{
    AdmissionConfirmation, AdmissionFilter, AdmissionPage, AdmissionStats,
    ConfirmationId, StaffId,
    admission::DEFAULT_PAGE_LIMIT,
    api::{
        AdmissionListQuery, ApiResponse, ConfirmAdmissionRequest,
        RejectAdmissionRequest,
    },
};

use crate::{
    AppState,
    infra::{errors::AppResult, extract::ApiJson},
};

pub async fn confirm_admission_handler(
    State(state): State<AppState>,
    Extension(staff_id): Extension<StaffId>,
    Path(confirmation_id): Path<ConfirmationId>,
    body: Option<ApiJson<ConfirmAdmissionRequest>>,
) -> AppResult<Json<ApiResponse<AdmissionConfirmation>>> {
    let ApiJson(request) = body.unwrap_or_default();
    let decided = state
        .admissions
        .confirm(confirmation_id, staff_id, request.notes)
        .await?;

    Ok(Json(ApiResponse::success(decided.confirmation)))
}

pub async fn reject_admission_handler(
    State(state): State<AppState>,
    Extension(staff_id): Extension<StaffId>,
    Path(confirmation_id): Path<ConfirmationId>,
    ApiJson(request): ApiJson<RejectAdmissionRequest>,
) -> AppResult<Json<ApiResponse<AdmissionConfirmation>>> {
    let decided = state
        .admissions
        .reject(confirmation_id, staff_id, &request.reason, request.notes)
        .await?;

    Ok(Json(ApiResponse::success(decided.confirmation)))
}

pub async fn get_admission_handler(
    State(state): State<AppState>,
    Path(confirmation_id): Path<ConfirmationId>,
) -> AppResult<Json<ApiResponse<AdmissionConfirmation>>> {
    let confirmation = state.admissions.get(confirmation_id).await?;
    Ok(Json(ApiResponse::success(confirmation)))
}

pub async fn list_admissions_handler(
    State(state): State<AppState>,
    Query(query): Query<AdmissionListQuery>,
) -> AppResult<Json<ApiResponse<AdmissionPage>>> {
    let filter = AdmissionFilter {
        status: query.status,
        search: query.search,
        page: query.page.unwrap_or(1),
        limit: query.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
    };

    let page = state.admissions.list(filter).await?;
    Ok(Json(ApiResponse::success(page)))
}

pub async fn admission_stats_handler(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<AdmissionStats>>> {
    let stats = state.admissions.stats().await?;
    Ok(Json(ApiResponse::success(stats)))
}
