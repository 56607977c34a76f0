#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use chrono::{TimeZone, Utc};
use serde_json::Value;
use storefront_api::{
    auth::{AuthError, AuthIdentity, AuthProvider, AuthUserRecord},
    build_router,
    config::{AppConfig, GatewayCredentials, PaymentMode},
    gateway::{CreateGatewayOrder, GatewayError, GatewayOrder, PaymentGateway},
    handlers::Collaborators,
    notifications::{EmailMessage, Mailer, NotificationError},
    services::checkout::Payments,
    store::{MemoryStore, RecordStore},
    AppState,
};
use tower::ServiceExt;

pub const ADMIN_TOKEN: &str = "admin-session";
pub const USER_TOKEN: &str = "visitor-session";
pub const ADMIN_EMAIL: &str = "owner@firm.example";
pub const GATEWAY_SECRET: &str = "test_gateway_secret";
pub const GATEWAY_KEY_ID: &str = "rzp_live_testkey";

/// Auth provider double: two known sessions and an editable user list.
#[derive(Default)]
pub struct FakeAuth {
    pub users: Mutex<Vec<AuthUserRecord>>,
    pub fail_listing: AtomicBool,
    pub bans: Mutex<Vec<(String, String)>>,
    pub resets: Mutex<Vec<(String, String)>>,
}

impl FakeAuth {
    pub fn with_users() -> Self {
        let fake = Self::default();
        *fake.users.lock().unwrap() = vec![
            record("u-admin", ADMIN_EMAIL, None),
            record("u-ana", "ana@client.example", None),
            record(
                "u-bob",
                "bob@client.example",
                Some(Utc.with_ymd_and_hms(2999, 1, 1, 0, 0, 0).unwrap()),
            ),
        ];
        fake
    }
}

fn record(id: &str, email: &str, banned_until: Option<chrono::DateTime<Utc>>) -> AuthUserRecord {
    AuthUserRecord {
        id: id.into(),
        email: Some(email.into()),
        created_at: Some(Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap()),
        last_sign_in_at: None,
        banned_until,
        sign_in_count: 3,
    }
}

#[async_trait]
impl AuthProvider for FakeAuth {
    async fn get_user(&self, access_token: &str) -> Result<AuthIdentity, AuthError> {
        match access_token {
            ADMIN_TOKEN => Ok(AuthIdentity {
                id: "u-admin".into(),
                email: ADMIN_EMAIL.into(),
            }),
            USER_TOKEN => Ok(AuthIdentity {
                id: "u-ana".into(),
                email: "ana@client.example".into(),
            }),
            _ => Err(AuthError::InvalidSession),
        }
    }

    async fn list_users(&self) -> Result<Vec<AuthUserRecord>, AuthError> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(AuthError::Api {
                status: 503,
                body: "admin api unavailable".into(),
            });
        }
        Ok(self.users.lock().unwrap().clone())
    }

    async fn ban_user(&self, user_id: &str, ban_duration: &str) -> Result<(), AuthError> {
        self.bans
            .lock()
            .unwrap()
            .push((user_id.to_string(), ban_duration.to_string()));
        Ok(())
    }

    async fn reset_password_for_email(&self, email: &str, redirect_to: &str) -> Result<(), AuthError> {
        self.resets
            .lock()
            .unwrap()
            .push((email.to_string(), redirect_to.to_string()));
        Ok(())
    }
}

/// Gateway double that counts orders and echoes the requested amount.
#[derive(Default)]
pub struct CountingGateway {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
}

#[async_trait]
impl PaymentGateway for CountingGateway {
    async fn create_order(&self, request: CreateGatewayOrder) -> Result<GatewayOrder, GatewayError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail.load(Ordering::SeqCst) {
            return Err(GatewayError::Api {
                status: 502,
                body: "bad gateway".into(),
            });
        }
        Ok(GatewayOrder {
            id: format!("order_live_{}", n),
            amount: request.amount,
            currency: request.currency,
        })
    }
}

/// Mailer double that keeps every message it is asked to send.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<EmailMessage>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), NotificationError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotificationError::Api {
                status: 500,
                body: "mail provider down".into(),
            });
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TestOptions {
    pub live_payments: bool,
}

/// Router plus handles on every collaborator double.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub auth: Arc<FakeAuth>,
    pub gateway: Arc<CountingGateway>,
    pub mailer: Arc<RecordingMailer>,
}

impl TestApp {
    /// Demo-mode application with in-memory collaborators.
    pub fn new() -> Self {
        Self::with_options(TestOptions::default())
    }

    pub fn live() -> Self {
        Self::with_options(TestOptions {
            live_payments: true,
        })
    }

    pub fn with_options(options: TestOptions) -> Self {
        let mut cfg = AppConfig::new("127.0.0.1".into(), 18_080, "development".into());
        cfg.admin_emails = ADMIN_EMAIL.into();
        cfg.email_from = "hello@firm.example".into();
        cfg.notification_email = Some("leads@firm.example".into());
        cfg.site_base_url = "https://firm.example".into();
        cfg.currency = "INR".into();

        let store = Arc::new(MemoryStore::new());
        let auth = Arc::new(FakeAuth::with_users());
        let gateway = Arc::new(CountingGateway::default());
        let mailer = Arc::new(RecordingMailer::default());

        let payments = if options.live_payments {
            let credentials = GatewayCredentials {
                key_id: GATEWAY_KEY_ID.into(),
                key_secret: GATEWAY_SECRET.into(),
            };
            cfg.payment_mode = PaymentMode::Live(credentials.clone());
            Payments::Live {
                gateway: gateway.clone(),
                credentials,
            }
        } else {
            Payments::Demo
        };

        let collaborators = Collaborators {
            store: store.clone() as Arc<dyn RecordStore>,
            auth: auth.clone(),
            mailer: mailer.clone(),
            payments,
        };

        let state = AppState::new(cfg, collaborators);
        let router = build_router(state.clone());

        Self {
            router,
            state,
            store,
            auth,
            gateway,
            mailer,
        }
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn request_as_admin(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.request(method, uri, body, Some(ADMIN_TOKEN)).await
    }

    /// Waits for background email tasks to deliver `count` messages.
    pub async fn wait_for_emails(&self, count: usize) -> Vec<EmailMessage> {
        for _ in 0..100 {
            let sent = self.mailer.sent.lock().unwrap().clone();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.mailer.sent.lock().unwrap().clone()
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
