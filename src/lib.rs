//! Storefront API Library
//!
//! Checkout, consultation intake and admin back office for a consultancy site.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod errors;
pub mod gateway;
pub mod handlers;
pub mod middleware_helpers;
pub mod models;
pub mod notifications;
pub mod openapi;
pub mod repositories;
pub mod services;
pub mod store;
pub mod tracing;

use axum::{
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::{
    auth::SessionResolver, config::AppConfig, handlers::Collaborators,
    services::catalog::Catalog,
};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub catalog: Arc<Catalog>,
    pub services: handlers::AppServices,
    pub sessions: Arc<SessionResolver>,
}

impl AppState {
    pub fn new(config: AppConfig, collaborators: Collaborators) -> Self {
        Self::with_catalog(config, Catalog::builtin(), collaborators)
    }

    pub fn with_catalog(config: AppConfig, catalog: Catalog, collaborators: Collaborators) -> Self {
        let catalog = Arc::new(catalog);
        let services = handlers::AppServices::new(&config, catalog.clone(), &collaborators);
        let sessions = Arc::new(SessionResolver::new(
            collaborators.auth.clone(),
            config.admin_policy(),
        ));
        Self {
            config: Arc::new(config),
            catalog,
            services,
            sessions,
        }
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn validation_errors(errors: Vec<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some("Validation failed".to_string()),
            errors: Some(errors),
            meta: Some(ResponseMeta::capture()),
        }
    }
}


/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Routes served under `/api`.
pub fn api_routes() -> Router<AppState> {
    let catalog = Router::new()
        .route("/catalog/services", get(handlers::catalog::list_services))
        .route("/catalog/services/:id", get(handlers::catalog::get_service));

    let checkout = Router::new()
        .route("/checkout/quote", post(handlers::checkout::quote))
        .route("/create-order", post(handlers::checkout::create_order))
        .route("/save-order", post(handlers::checkout::save_order));

    let consultations = Router::new().route(
        "/consultation",
        post(handlers::consultations::submit_consultation)
            .get(handlers::consultations::list_consultations),
    );

    // Every admin handler takes an AdminSession extractor
    let admin = Router::new()
        .route("/dashboard", get(handlers::admin::dashboard))
        .route("/stats", get(handlers::admin::stats))
        .route("/orders", get(handlers::admin::list_orders))
        .route("/orders/:id", delete(handlers::admin::delete_order))
        .route(
            "/orders/:id/status",
            put(handlers::admin::update_order_status),
        )
        .route("/consultations", get(handlers::admin::list_consultations))
        .route(
            "/consultations/:id",
            delete(handlers::admin::delete_consultation),
        )
        .route(
            "/consultations/:id/status",
            put(handlers::admin::update_consultation_status),
        )
        .route("/users", get(handlers::admin::list_users))
        .route("/users/suspend", post(handlers::admin::suspend_user))
        .route(
            "/users/reset-password",
            post(handlers::admin::reset_password),
        );

    Router::new()
        .merge(catalog)
        .merge(checkout)
        .merge(consultations)
        .nest("/admin", admin)
}

/// Full application router with docs, request ids and HTTP tracing.
/// CORS, compression and timeouts are layered on by the binary.
pub fn build_router(state: AppState) -> Router {
    Router::<AppState>::new()
        .route("/", get(|| async { "storefront-api up" }))
        .merge(handlers::health::health_routes())
        .nest("/api", api_routes())
        .merge(openapi::swagger_ui())
        .layer(crate::tracing::configure_http_tracing())
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}
