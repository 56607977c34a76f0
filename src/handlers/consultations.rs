use axum::{extract::State, http::StatusCode, Json};

use crate::{
    auth::AdminSession,
    errors::ServiceError,
    models::ConsultationRequest,
    services::consultations::ConsultationInput,
    ApiResponse, ApiResult, AppState,
};

#[utoipa::path(
    post,
    path = "/api/consultation",
    summary = "Submit consultation request",
    description = "Records a lead from the contact form. Notification emails are sent in the background.",
    request_body = ConsultationInput,
    responses(
        (status = 201, description = "Request recorded", body = ApiResponse<ConsultationRequest>),
        (status = 400, description = "Validation failed", body = crate::errors::ErrorResponse),
        (status = 500, description = "Request could not be stored", body = crate::errors::ErrorResponse)
    ),
    tag = "consultations"
)]
pub async fn submit_consultation(
    State(state): State<AppState>,
    Json(payload): Json<ConsultationInput>,
) -> Result<(StatusCode, Json<ApiResponse<ConsultationRequest>>), ServiceError> {
    let saved = state.services.consultations.submit(payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(saved))))
}

#[utoipa::path(
    get,
    path = "/api/consultation",
    summary = "List consultation requests",
    responses(
        (status = 200, description = "Requests, newest first", body = ApiResponse<Vec<ConsultationRequest>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "consultations"
)]
pub async fn list_consultations(
    _admin: AdminSession,
    State(state): State<AppState>,
) -> ApiResult<Vec<ConsultationRequest>> {
    let requests = state.services.consultations.list().await?;
    Ok(Json(ApiResponse::success(requests)))
}
