use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::{AdminSession, Confirmation},
    errors::ServiceError,
    models::{ConsultationRequest, ConsultationStatus, Order, OrderStatus, UserAccount},
    services::{
        admin::{AdminStats, Dashboard},
        filters::ListFilter,
    },
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateConsultationStatusRequest {
    pub status: ConsultationStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SuspendUserRequest {
    pub user_id: String,
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResetPasswordRequest {
    pub email: String,
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResult {
    pub message: String,
}

#[utoipa::path(
    get,
    path = "/api/admin/dashboard",
    summary = "Admin dashboard",
    description = "Stats, orders, consultations and users. Each section loads independently and carries its own error.",
    responses(
        (status = 200, description = "Dashboard sections", body = ApiResponse<Dashboard>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "admin"
)]
pub async fn dashboard(_admin: AdminSession, State(state): State<AppState>) -> ApiResult<Dashboard> {
    Ok(Json(ApiResponse::success(
        state.services.admin.load_dashboard().await,
    )))
}

#[utoipa::path(
    get,
    path = "/api/admin/stats",
    summary = "Dashboard statistics",
    responses(
        (status = 200, description = "Statistics", body = ApiResponse<AdminStats>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "admin"
)]
pub async fn stats(_admin: AdminSession, State(state): State<AppState>) -> ApiResult<AdminStats> {
    Ok(Json(ApiResponse::success(state.services.admin.stats().await?)))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders",
    summary = "List orders",
    params(ListFilter),
    responses(
        (status = 200, description = "Orders, newest first", body = ApiResponse<Vec<Order>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "admin"
)]
pub async fn list_orders(
    _admin: AdminSession,
    State(state): State<AppState>,
    Query(filter): Query<ListFilter>,
) -> ApiResult<Vec<Order>> {
    Ok(Json(ApiResponse::success(
        state.services.admin.orders(&filter).await?,
    )))
}

#[utoipa::path(
    get,
    path = "/api/admin/consultations",
    summary = "List consultation requests",
    params(ListFilter),
    responses(
        (status = 200, description = "Requests, newest first", body = ApiResponse<Vec<ConsultationRequest>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "admin"
)]
pub async fn list_consultations(
    _admin: AdminSession,
    State(state): State<AppState>,
    Query(filter): Query<ListFilter>,
) -> ApiResult<Vec<ConsultationRequest>> {
    Ok(Json(ApiResponse::success(
        state.services.admin.consultations(&filter).await?,
    )))
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    summary = "List users",
    params(ListFilter),
    responses(
        (status = 200, description = "Accounts known to the auth service", body = ApiResponse<Vec<UserAccount>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "admin"
)]
pub async fn list_users(
    _admin: AdminSession,
    State(state): State<AppState>,
    Query(filter): Query<ListFilter>,
) -> ApiResult<Vec<UserAccount>> {
    Ok(Json(ApiResponse::success(
        state.services.admin.users(&filter).await?,
    )))
}

#[utoipa::path(
    put,
    path = "/api/admin/orders/{id}/status",
    summary = "Change order status",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = ApiResponse<Order>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Transition not allowed", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "admin"
)]
pub async fn update_order_status(
    admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> ApiResult<Order> {
    tracing::info!(admin = %admin.identity.id, order_id = %id, "order status change requested");
    let order = state
        .services
        .admin
        .update_order_status(id, payload.status)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

#[utoipa::path(
    put,
    path = "/api/admin/consultations/{id}/status",
    summary = "Change consultation status",
    params(("id" = Uuid, Path, description = "Consultation request id")),
    request_body = UpdateConsultationStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = ApiResponse<ConsultationRequest>),
        (status = 404, description = "Request not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Transition not allowed", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "admin"
)]
pub async fn update_consultation_status(
    admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateConsultationStatusRequest>,
) -> ApiResult<ConsultationRequest> {
    tracing::info!(admin = %admin.identity.id, consultation_id = %id, "consultation status change requested");
    let request = state
        .services
        .admin
        .update_consultation_status(id, payload.status, payload.notes)
        .await?;
    Ok(Json(ApiResponse::success(request)))
}

#[utoipa::path(
    delete,
    path = "/api/admin/orders/{id}",
    summary = "Delete order",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "admin"
)]
pub async fn delete_order(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.admin.delete_order(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/api/admin/consultations/{id}",
    summary = "Delete consultation request",
    params(("id" = Uuid, Path, description = "Consultation request id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Request not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "admin"
)]
pub async fn delete_consultation(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.admin.delete_consultation(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/admin/users/suspend",
    summary = "Suspend user",
    description = "Bans the account indefinitely. Requires `confirm: true`.",
    request_body = SuspendUserRequest,
    responses(
        (status = 200, description = "User suspended", body = ApiResponse<ActionResult>),
        (status = 400, description = "Confirmation missing", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "admin"
)]
pub async fn suspend_user(
    admin: AdminSession,
    State(state): State<AppState>,
    Json(payload): Json<SuspendUserRequest>,
) -> ApiResult<ActionResult> {
    let confirmed = Confirmation::from_flag(payload.confirm, "suspending a user")?;
    tracing::warn!(admin = %admin.identity.id, user_id = %payload.user_id, "suspending user");
    state
        .services
        .admin
        .suspend_user(&payload.user_id, confirmed)
        .await?;
    Ok(Json(ApiResponse::success(ActionResult {
        message: "User suspended".into(),
    })))
}

#[utoipa::path(
    post,
    path = "/api/admin/users/reset-password",
    summary = "Send password reset",
    description = "Emails the user a recovery link. Requires `confirm: true`.",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Reset email requested", body = ApiResponse<ActionResult>),
        (status = 400, description = "Confirmation missing or bad email", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "admin"
)]
pub async fn reset_password(
    admin: AdminSession,
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> ApiResult<ActionResult> {
    let confirmed = Confirmation::from_flag(payload.confirm, "resetting a password")?;
    tracing::info!(admin = %admin.identity.id, "password reset requested");
    state
        .services
        .admin
        .reset_password(&payload.email, confirmed)
        .await?;
    Ok(Json(ApiResponse::success(ActionResult {
        message: "Password reset email sent".into(),
    })))
}
