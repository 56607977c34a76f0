//! End-to-end checkout over HTTP: quoting, payment intents and order
//! recording in both demo and live gateway modes.

mod common;

use std::sync::atomic::Ordering;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp, GATEWAY_KEY_ID, GATEWAY_SECRET};
use serde_json::json;
use storefront_api::{gateway::payment_signature, store::Table};

#[tokio::test]
async fn catalog_lists_services_and_their_addons() {
    let app = TestApp::new();

    let response = app
        .request(Method::GET, "/api/catalog/services", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 4);

    let response = app
        .request(
            Method::GET,
            "/api/catalog/services/digital-presence-audit",
            None,
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["service"]["display_name"], "Digital Presence Audit");
    assert_eq!(body["data"]["addons"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn unknown_service_is_not_found() {
    let app = TestApp::new();
    let response = app
        .request(Method::GET, "/api/catalog/services/nope", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn quote_splits_one_time_and_monthly_totals() {
    let app = TestApp::new();

    let response = app
        .request(
            Method::POST,
            "/api/checkout/quote",
            Some(json!({
                "service_id": "digital-presence-audit",
                "addons": [
                    { "id": "competitor-deep-dive" },
                    { "id": "monthly-retainer" }
                ]
            })),
            None,
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["totals"]["one_time_total"], "44998");
    assert_eq!(body["data"]["totals"]["monthly_total"], "9999");
    assert_eq!(body["data"]["amount_minor_units"], 4_499_800);
    assert_eq!(body["data"]["currency"], "INR");
}

#[tokio::test]
async fn quote_clamps_negotiated_prices_into_range() {
    let app = TestApp::new();

    let response = app
        .request(
            Method::POST,
            "/api/checkout/quote",
            Some(json!({
                "service_id": "digital-presence-audit",
                "addons": [{ "id": "seo-foundations", "price": "1000000" }]
            })),
            None,
        )
        .await;

    let body = response_json(response).await;
    // 14999 base + 24999 range ceiling
    assert_eq!(body["data"]["totals"]["one_time_total"], "39998");
}

#[tokio::test]
async fn addon_not_offered_with_service_is_rejected() {
    let app = TestApp::new();

    let response = app
        .request(
            Method::POST,
            "/api/checkout/quote",
            Some(json!({
                "service_id": "digital-presence-audit",
                "addons": [{ "id": "onsite-workshop" }]
            })),
            None,
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn demo_checkout_records_order_outside_revenue() {
    let app = TestApp::new();

    let response = app
        .request(
            Method::POST,
            "/api/create-order",
            Some(json!({
                "service_id": "growth-strategy-sprint",
                "addons": [{ "id": "onsite-workshop" }]
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let intent = response_json(response).await;
    assert_eq!(intent["data"]["mode"], "demo");
    assert!(intent["data"]["key_id"].is_null());
    let handle = intent["data"]["gateway_order_id"].as_str().unwrap().to_string();
    assert!(handle.starts_with("order_demo_"));
    assert_eq!(app.gateway.calls.load(Ordering::SeqCst), 0);

    let response = app
        .request(
            Method::POST,
            "/api/save-order",
            Some(json!({
                "service_id": "growth-strategy-sprint",
                "addons": [{ "id": "onsite-workshop" }],
                "customer_email": "buyer@client.example",
                "customer_name": "Priya Shah",
                "payment": { "order_id": handle }
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let saved = response_json(response).await;
    assert_eq!(saved["data"]["status"], "paid");
    assert_eq!(saved["data"]["payment_mode"], "demo");
    assert_eq!(saved["data"]["one_time_total"], "69998");
    assert_eq!(app.store.len(Table::Orders).await, 1);

    let stats = app
        .request_as_admin(Method::GET, "/api/admin/stats", None)
        .await;
    let stats = response_json(stats).await;
    assert_eq!(stats["data"]["total_orders"], 1);
    assert_eq!(stats["data"]["total_revenue"], "0");
}

#[tokio::test]
async fn demo_mode_refuses_non_demo_handles() {
    let app = TestApp::new();

    let response = app
        .request(
            Method::POST,
            "/api/save-order",
            Some(json!({
                "service_id": "growth-strategy-sprint",
                "customer_email": "buyer@client.example",
                "payment": { "order_id": "order_live_1", "payment_id": "pay_1", "signature": "abc" }
            })),
            None,
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.store.len(Table::Orders).await, 0);
}

#[tokio::test]
async fn live_checkout_verifies_signature_before_recording() {
    let app = TestApp::live();

    let response = app
        .request(
            Method::POST,
            "/api/create-order",
            Some(json!({ "service_id": "web-platform-build" })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let intent = response_json(response).await;
    assert_eq!(intent["data"]["mode"], "live");
    assert_eq!(intent["data"]["key_id"], GATEWAY_KEY_ID);
    assert_eq!(intent["data"]["amount_minor_units"], 9_999_900);
    let gateway_order_id = intent["data"]["gateway_order_id"].as_str().unwrap().to_string();
    assert_eq!(app.gateway.calls.load(Ordering::SeqCst), 1);

    let signature = payment_signature(&gateway_order_id, "pay_123", GATEWAY_SECRET).unwrap();
    let response = app
        .request(
            Method::POST,
            "/api/save-order",
            Some(json!({
                "service_id": "web-platform-build",
                "customer_email": "cto@client.example",
                "payment": {
                    "order_id": gateway_order_id,
                    "payment_id": "pay_123",
                    "signature": signature
                }
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let saved = response_json(response).await;
    assert_eq!(saved["data"]["payment_mode"], "live");
    assert_eq!(saved["data"]["gateway_payment_id"], "pay_123");

    let stats = app
        .request_as_admin(Method::GET, "/api/admin/stats", None)
        .await;
    let stats = response_json(stats).await;
    assert_eq!(stats["data"]["total_revenue"], "99999");
}

#[tokio::test]
async fn tampered_signature_is_rejected_without_writing() {
    let app = TestApp::live();

    let response = app
        .request(
            Method::POST,
            "/api/save-order",
            Some(json!({
                "service_id": "web-platform-build",
                "customer_email": "cto@client.example",
                "payment": {
                    "order_id": "order_live_1",
                    "payment_id": "pay_123",
                    "signature": "deadbeef"
                }
            })),
            None,
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.store.len(Table::Orders).await, 0);
}

#[tokio::test]
async fn gateway_outage_surfaces_as_server_error() {
    let app = TestApp::live();
    app.gateway.fail.store(true, Ordering::SeqCst);

    let response = app
        .request(
            Method::POST,
            "/api/create-order",
            Some(json!({ "service_id": "web-platform-build" })),
            None,
        )
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response_json(response).await;
    assert_eq!(body["error"], "Payment gateway is unavailable, please try again");
}

#[tokio::test]
async fn responses_echo_request_id() {
    let app = TestApp::new();
    let response = app
        .request(Method::GET, "/api/catalog/services", None, None)
        .await;
    assert!(response.headers().get("x-request-id").is_some());
}

async fn live_intent(app: &TestApp, service_id: &str) -> String {
    let response = app
        .request(
            Method::POST,
            "/api/create-order",
            Some(json!({ "service_id": service_id })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let intent = response_json(response).await;
    intent["data"]["gateway_order_id"].as_str().unwrap().to_string()
}

fn paid_callback(service_id: &str, gateway_order_id: &str) -> serde_json::Value {
    json!({
        "service_id": service_id,
        "customer_email": "cto@client.example",
        "payment": {
            "order_id": gateway_order_id,
            "payment_id": "pay_1",
            "signature": payment_signature(gateway_order_id, "pay_1", GATEWAY_SECRET).unwrap()
        }
    })
}

#[tokio::test]
async fn a_payment_is_recorded_only_once() {
    let app = TestApp::live();
    let gateway_order_id = live_intent(&app, "digital-presence-audit").await;
    let callback = paid_callback("digital-presence-audit", &gateway_order_id);

    let first = app
        .request(Method::POST, "/api/save-order", Some(callback.clone()), None)
        .await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let replay = app
        .request(Method::POST, "/api/save-order", Some(callback), None)
        .await;
    assert_eq!(replay.status(), StatusCode::CONFLICT);

    let swapped = app
        .request(
            Method::POST,
            "/api/save-order",
            Some(paid_callback("web-platform-build", &gateway_order_id)),
            None,
        )
        .await;
    assert!(swapped.status().is_client_error());

    assert_eq!(app.store.len(Table::Orders).await, 1);
    let stats = app
        .request_as_admin(Method::GET, "/api/admin/stats", None)
        .await;
    let stats = response_json(stats).await;
    assert_eq!(stats["data"]["total_revenue"], "14999");
    assert_eq!(stats["data"]["pending_payments"], 0);
}

#[tokio::test]
async fn payment_for_another_service_is_rejected() {
    let app = TestApp::live();
    let gateway_order_id = live_intent(&app, "digital-presence-audit").await;

    let response = app
        .request(
            Method::POST,
            "/api/save-order",
            Some(paid_callback("web-platform-build", &gateway_order_id)),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let stats = app
        .request_as_admin(Method::GET, "/api/admin/stats", None)
        .await;
    let stats = response_json(stats).await;
    assert_eq!(stats["data"]["total_revenue"], "0");
    assert_eq!(stats["data"]["pending_payments"], 1);
}

#[tokio::test]
async fn unpaid_intent_counts_as_pending_payment() {
    let app = TestApp::live();
    live_intent(&app, "web-platform-build").await;

    let stats = app
        .request_as_admin(Method::GET, "/api/admin/stats", None)
        .await;
    let stats = response_json(stats).await;
    assert_eq!(stats["data"]["pending_payments"], 1);
    assert_eq!(stats["data"]["total_revenue"], "0");
}

#[tokio::test]
async fn only_the_store_currency_is_charged() {
    let app = TestApp::live();

    let response = app
        .request(
            Method::POST,
            "/api/create-order",
            Some(json!({ "service_id": "digital-presence-audit", "currency": "IDR" })),
            None,
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.gateway.calls.load(Ordering::SeqCst), 0);
    assert_eq!(app.store.len(Table::Orders).await, 0);
}
