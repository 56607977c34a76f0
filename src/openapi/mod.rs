use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront API",
        version = "1.0.0",
        description = r#"
# Storefront API

Checkout, lead intake and back-office operations for a consultancy website.

## Features

- **Catalog**: Services on offer and the add-ons sold with them
- **Checkout**: Server-side totals, gateway order creation and payment recording
- **Consultations**: Contact form intake with email notifications
- **Admin**: Dashboard statistics, order and lead workflows, user moderation

## Authentication

Public endpoints (catalog, checkout, consultation intake) need no credentials.
Admin endpoints require a session token from the auth provider whose email is on
the admin allowlist:

```
Authorization: Bearer <access-token>
```

## Demo mode

When no payment gateway credentials are configured, `/api/create-order` returns a
demo handle prefixed `order_demo_` and no money moves. Demo orders are stored but
never counted as revenue.

## Error Handling

```json
{
  "error": {
    "code": "INVALID_STATUS",
    "message": "Invalid status transition: cannot move from 'paid' to 'pending'",
    "status": 409
  }
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "catalog", description = "Service catalog"),
        (name = "checkout", description = "Quotes, payment intents and order recording"),
        (name = "consultations", description = "Consultation request intake"),
        (name = "admin", description = "Administrative endpoints")
    ),
    paths(
        // Catalog
        crate::handlers::catalog::list_services,
        crate::handlers::catalog::get_service,

        // Checkout
        crate::handlers::checkout::quote,
        crate::handlers::checkout::create_order,
        crate::handlers::checkout::save_order,

        // Consultations
        crate::handlers::consultations::submit_consultation,
        crate::handlers::consultations::list_consultations,

        // Admin
        crate::handlers::admin::dashboard,
        crate::handlers::admin::stats,
        crate::handlers::admin::list_orders,
        crate::handlers::admin::list_consultations,
        crate::handlers::admin::list_users,
        crate::handlers::admin::update_order_status,
        crate::handlers::admin::update_consultation_status,
        crate::handlers::admin::delete_order,
        crate::handlers::admin::delete_consultation,
        crate::handlers::admin::suspend_user,
        crate::handlers::admin::reset_password,
    ),
    components(
        schemas(
            crate::ApiResponse<serde_json::Value>,

            crate::services::catalog::Service,
            crate::services::catalog::AddOn,
            crate::services::catalog::PriceSpec,
            crate::services::catalog::BillingType,
            crate::handlers::catalog::ServiceDetail,

            crate::services::selection::AddOnChoice,
            crate::services::selection::CheckoutTotals,
            crate::services::checkout::QuoteRequest,
            crate::services::checkout::Quote,
            crate::services::checkout::CreateOrderRequest,
            crate::services::checkout::PaymentIntent,
            crate::services::checkout::GatewayCallback,
            crate::services::checkout::SaveOrderRequest,

            crate::models::Order,
            crate::models::OrderAddOn,
            crate::models::OrderStatus,
            crate::models::PaymentModeKind,
            crate::models::ConsultationRequest,
            crate::models::ConsultationStatus,
            crate::models::ConsultationPriority,
            crate::models::ConsultationSource,
            crate::models::UserAccount,
            crate::models::Role,
            crate::services::consultations::ConsultationInput,

            crate::services::admin::AdminStats,
            crate::services::admin::Dashboard,
            crate::handlers::admin::UpdateOrderStatusRequest,
            crate::handlers::admin::UpdateConsultationStatusRequest,
            crate::handlers::admin::SuspendUserRequest,
            crate::handlers::admin::ResetPasswordRequest,
            crate::handlers::admin::ActionResult,

            crate::errors::ErrorResponse
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDocV1;

/// Registers the bearer scheme referenced by `security(("Bearer" = []))`.
pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "Bearer",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
