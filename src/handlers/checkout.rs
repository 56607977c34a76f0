use axum::{extract::State, http::StatusCode, Json};

use crate::{
    models::Order,
    services::checkout::{CreateOrderRequest, PaymentIntent, Quote, QuoteRequest, SaveOrderRequest},
    ApiResponse, ApiResult, AppState,
};

#[utoipa::path(
    post,
    path = "/api/checkout/quote",
    summary = "Quote a selection",
    description = "Totals for a service and add-on selection, computed the same way checkout will charge them",
    request_body = QuoteRequest,
    responses(
        (status = 200, description = "Totals computed", body = ApiResponse<Quote>),
        (status = 400, description = "Invalid selection", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown service", body = crate::errors::ErrorResponse)
    ),
    tag = "checkout"
)]
pub async fn quote(
    State(state): State<AppState>,
    Json(payload): Json<QuoteRequest>,
) -> ApiResult<Quote> {
    let quote = state.services.checkout.quote(&payload)?;
    Ok(Json(ApiResponse::success(quote)))
}

#[utoipa::path(
    post,
    path = "/api/create-order",
    summary = "Create payment intent",
    description = "Creates a gateway order for the selection, or a demo handle when no gateway is configured",
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Intent created", body = ApiResponse<PaymentIntent>),
        (status = 400, description = "Invalid selection", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown service", body = crate::errors::ErrorResponse),
        (status = 500, description = "Gateway unavailable", body = crate::errors::ErrorResponse)
    ),
    tag = "checkout"
)]
pub async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> ApiResult<PaymentIntent> {
    let intent = state.services.checkout.create_payment_intent(payload).await?;
    Ok(Json(ApiResponse::success(intent)))
}

#[utoipa::path(
    post,
    path = "/api/save-order",
    summary = "Record a completed payment",
    description = "Verifies the gateway signature (live mode) and settles the order created for that payment intent",
    request_body = SaveOrderRequest,
    responses(
        (status = 201, description = "Order stored", body = ApiResponse<Order>),
        (status = 400, description = "Invalid request, signature or unknown payment order", body = crate::errors::ErrorResponse),
        (status = 409, description = "Payment already recorded", body = crate::errors::ErrorResponse),
        (status = 500, description = "Order could not be stored", body = crate::errors::ErrorResponse)
    ),
    tag = "checkout"
)]
pub async fn save_order(
    State(state): State<AppState>,
    Json(payload): Json<SaveOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Order>>), crate::errors::ServiceError> {
    let order = state.services.checkout.record_payment(payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(order))))
}
