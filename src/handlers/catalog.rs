use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    errors::ServiceError,
    services::catalog::{AddOn, Service},
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct ServiceDetail {
    pub service: Service,
    pub addons: Vec<AddOn>,
}

#[utoipa::path(
    get,
    path = "/api/catalog/services",
    summary = "List services",
    responses(
        (status = 200, description = "All services on offer", body = ApiResponse<Vec<Service>>)
    ),
    tag = "catalog"
)]
pub async fn list_services(State(state): State<AppState>) -> ApiResult<Vec<Service>> {
    Ok(Json(ApiResponse::success(state.catalog.services().to_vec())))
}

#[utoipa::path(
    get,
    path = "/api/catalog/services/{id}",
    summary = "Get service",
    description = "A service together with the add-ons offered with it",
    params(("id" = String, Path, description = "Service id")),
    responses(
        (status = 200, description = "Service found", body = ApiResponse<ServiceDetail>),
        (status = 404, description = "Unknown service", body = crate::errors::ErrorResponse)
    ),
    tag = "catalog"
)]
pub async fn get_service(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ServiceDetail> {
    let service = state
        .catalog
        .service(&id)
        .ok_or_else(|| ServiceError::NotFound(format!("service '{}'", id)))?;
    Ok(Json(ApiResponse::success(ServiceDetail {
        addons: state.catalog.addons_for(service),
        service: service.clone(),
    })))
}
