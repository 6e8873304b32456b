use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use cohort_core::domain::progress::ProgressError;
use cohort_model::{
    CourseId, CourseProgress, StudentId,
    api::{
        ApiResponse, CourseOutlineResponse, CurrentLectureView,
        MarkCompleteRequest, MarkCompleteResponse, OutlineLectureView,
        OutlineQuery, ProgressQuery,
    },
};

use crate::{
    AppState,
    infra::{errors::AppResult, extract::ApiJson},
};

pub async fn mark_complete_handler(
    State(state): State<AppState>,
    Extension(student_id): Extension<StudentId>,
    ApiJson(request): ApiJson<MarkCompleteRequest>,
) -> AppResult<Json<ApiResponse<MarkCompleteResponse>>> {
    let outcome = state
        .progress
        .mark_complete(student_id, request.course_id, request.lecture_id)
        .await?;

    Ok(Json(ApiResponse::success(MarkCompleteResponse {
        newly_completed: outcome.newly_completed,
        progress: outcome.progress,
    })))
}

pub async fn course_progress_handler(
    State(state): State<AppState>,
    Extension(student_id): Extension<StudentId>,
    Query(query): Query<ProgressQuery>,
) -> AppResult<Json<ApiResponse<CourseProgress>>> {
    let progress = state.progress.progress(student_id, query.course_id).await?;
    Ok(Json(ApiResponse::success(progress)))
}

/// Lectures in play order with this student's completion flags. With
/// `?lectureId=` the response also names that lecture's neighbours.
pub async fn course_outline_handler(
    State(state): State<AppState>,
    Extension(student_id): Extension<StudentId>,
    Path(course_id): Path<CourseId>,
    Query(query): Query<OutlineQuery>,
) -> AppResult<Json<ApiResponse<CourseOutlineResponse>>> {
    let view = state
        .progress
        .outline_with_progress(student_id, course_id)
        .await?;

    let current = query
        .lecture_id
        .map(|lecture_id| {
            view.position(lecture_id)
                .ok_or(ProgressError::UnknownLecture {
                    course_id,
                    lecture_id,
                })
        })
        .transpose()?
        .map(|position| CurrentLectureView {
            lecture_id: position.lecture_id,
            index: position.index,
            previous_lecture_id: position.previous,
            following_lecture_id: position.next,
            completed: position.completed,
        });

    let lectures = view
        .outline
        .entries()
        .iter()
        .map(|entry| OutlineLectureView {
            index: entry.index,
            section_id: entry.section_id,
            lecture_id: entry.lecture_id,
            title: entry.title.clone(),
            duration_seconds: entry.duration_seconds,
            completed: view.completed.contains(&entry.lecture_id),
        })
        .collect();

    Ok(Json(ApiResponse::success(CourseOutlineResponse {
        course_id: view.outline.course_id(),
        title: view.outline.title().to_string(),
        total_duration_seconds: view.outline.total_duration_seconds(),
        lectures,
        next_lecture_id: view.next_lecture,
        progress: view.progress,
        current,
    })))
}
