pub mod admin;
pub mod catalog;
pub mod checkout;
pub mod consultations;
pub mod health;

use std::{sync::Arc, time::Duration};

use tracing::info;

use crate::{
    auth::{AuthProvider, DisabledAuth, SupabaseAuthClient},
    config::{AppConfig, PaymentMode},
    errors::ServiceError,
    gateway::razorpay::RazorpayClient,
    notifications::{resend::ResendMailer, LogMailer, Mailer, Notifier},
    repositories::{ConsultationRepository, OrderRepository},
    services::{
        admin::AdminService, catalog::Catalog, checkout::CheckoutService,
        checkout::Payments, checkout_session::CheckoutSession, consultations::ConsultationService,
    },
    store::{memory::MemoryStore, postgrest::PostgrestStore, RecordStore},
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// External services the application talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn RecordStore>,
    pub auth: Arc<dyn AuthProvider>,
    pub mailer: Arc<dyn Mailer>,
    pub payments: Payments,
}

impl Collaborators {
    /// Builds the real clients for whatever is configured; anything missing
    /// falls back to a local stand-in so the site still runs.
    pub fn from_config(config: &AppConfig) -> Result<Self, ServiceError> {
        let timeout = config.http_timeout();

        let (store, auth): (Arc<dyn RecordStore>, Arc<dyn AuthProvider>) = match config.supabase() {
            Some(supabase) => {
                info!(url = %supabase.url, "using hosted record store and auth");
                (
                    Arc::new(PostgrestStore::new(
                        supabase.url,
                        supabase.service_role_key,
                        timeout,
                    )?),
                    Arc::new(SupabaseAuthClient::new(
                        supabase.url,
                        supabase.anon_key,
                        supabase.service_role_key,
                        timeout,
                    )?),
                )
            }
            None => {
                info!("no hosted backend configured; using in-memory store, admin disabled");
                (Arc::new(MemoryStore::new()), Arc::new(DisabledAuth))
            }
        };

        let mailer: Arc<dyn Mailer> = match config.resend_key() {
            Some(key) => Arc::new(ResendMailer::new(
                crate::notifications::resend::RESEND_API_BASE,
                key,
                timeout,
            )?),
            None => Arc::new(LogMailer),
        };

        let payments = match &config.payment_mode {
            PaymentMode::Live(credentials) => Payments::Live {
                gateway: Arc::new(RazorpayClient::new(
                    config.razorpay_api_base.as_str(),
                    credentials.key_id.as_str(),
                    credentials.key_secret.as_str(),
                    timeout,
                )?),
                credentials: credentials.clone(),
            },
            PaymentMode::Demo => Payments::Demo,
        };

        Ok(Self {
            store,
            auth,
            mailer,
            payments,
        })
    }
}

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub checkout: Arc<CheckoutService>,
    pub consultations: Arc<ConsultationService>,
    pub admin: Arc<AdminService>,
    demo_payment_delay: Duration,
}

impl AppServices {
    pub fn new(config: &AppConfig, catalog: Arc<Catalog>, collaborators: &Collaborators) -> Self {
        let orders = OrderRepository::new(collaborators.store.clone());
        let notifier = Notifier::new(
            collaborators.mailer.clone(),
            config.email_from.clone(),
            config.notification_recipient(),
        );
        let consultations = ConsultationService::new(
            ConsultationRepository::new(collaborators.store.clone()),
            notifier,
        );

        let checkout = CheckoutService::new(
            catalog,
            orders.clone(),
            collaborators.payments.clone(),
            config.currency.clone(),
            config.future_payment_policy,
        );

        let admin = AdminService::new(
            orders,
            consultations.clone(),
            collaborators.auth.clone(),
            config.admin_policy(),
            config.site_base_url.clone(),
        );

        Self {
            checkout: Arc::new(checkout),
            consultations: Arc::new(consultations),
            admin: Arc::new(admin),
            demo_payment_delay: config.demo_payment_delay(),
        }
    }

    /// A fresh buyer session backed by this server's checkout service.
    pub fn checkout_session(&self) -> CheckoutSession<CheckoutService> {
        CheckoutSession::new(
            self.checkout.clone(),
            self.checkout.catalog().clone(),
            self.checkout.policy(),
        )
        .with_demo_delay(self.demo_payment_delay)
    }
}
