//! Request and response payloads of the HTTP surface. Field names are
//! camelCase on the wire.

use serde::{Deserialize, Serialize};

use crate::{
    admission::{AdmissionConfirmation, AdmissionStatus},
    enrollment::{EnrollmentStatus, Payment},
    ids::{CourseId, LectureId, PaymentId, SectionId},
    progress::CourseProgress,
};

/// Success envelope. Error bodies are rendered by the server's error type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success".to_string(),
            data,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub course_id: Option<CourseId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub order_id: String,
    pub amount: i64,
    pub currency: String,
    /// Public gateway key the client needs to open checkout.
    pub key_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentResponse {
    /// Always `"confirmed"` on success, including idempotent replays.
    pub status: String,
    pub payment_id: PaymentId,
    pub enrollment_status: EnrollmentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentStatusResponse {
    pub status: EnrollmentStatus,
    pub payment_completed: bool,
    pub active_payment: Option<Payment>,
    pub confirmation: Option<AdmissionConfirmation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmAdmissionRequest {
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectAdmissionRequest {
    pub reason: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionListQuery {
    pub status: Option<AdmissionStatus>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkCompleteRequest {
    pub course_id: CourseId,
    pub lecture_id: LectureId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkCompleteResponse {
    pub newly_completed: bool,
    pub progress: CourseProgress,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressQuery {
    pub course_id: CourseId,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineQuery {
    /// Lecture the student is on; adds its neighbours to the response.
    #[serde(default)]
    pub lecture_id: Option<LectureId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineLectureView {
    pub index: usize,
    pub section_id: SectionId,
    pub lecture_id: LectureId,
    pub title: String,
    pub duration_seconds: u32,
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseOutlineResponse {
    pub course_id: CourseId,
    pub title: String,
    pub total_duration_seconds: u64,
    pub lectures: Vec<OutlineLectureView>,
    pub next_lecture_id: Option<LectureId>,
    pub progress: CourseProgress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<CurrentLectureView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentLectureView {
    pub lecture_id: LectureId,
    pub index: usize,
    pub previous_lecture_id: Option<LectureId>,
    pub following_lecture_id: Option<LectureId>,
    pub completed: bool,
}
