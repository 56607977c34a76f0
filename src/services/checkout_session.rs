//! Buyer-side checkout orchestration.
//!
//! A [`CheckoutSession`] drives one buyer through selection and payment.
//! It talks to the server through [`CheckoutBackend`] and owns the only
//! piece of real state in checkout: whether a payment is in flight.
//!
//! ```text
//! Idle -> ServiceLoaded -> Submitting -> DemoSucceeded
//!                              |      -> GatewaySucceeded
//!                              +-----> Failed(reason) -> Submitting (manual retry)
//! ```

use rust_decimal::Decimal;
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::{
    catalog::Catalog,
    checkout::{CheckoutBackend, CreateOrderRequest, GatewayCallback, PaymentIntent, SaveOrderRequest},
    selection::{CheckoutTotals, FuturePaymentPolicy, SelectedAddOn, Selection, SelectionError},
};
use crate::{errors::ServiceError, models::PaymentModeKind};

pub const SERVICES_FALLBACK_ROUTE: &str = "/services";
pub const DEFAULT_DEMO_DELAY: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutFailure {
    UserCancelled,
    GatewayUnavailable,
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutConfirmation {
    pub gateway_order_id: String,
    /// Persisted order id; `None` when saving failed after payment
    pub order_id: Option<Uuid>,
    pub persisted: bool,
    pub totals: CheckoutTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CheckoutState {
    Idle,
    ServiceLoaded,
    Submitting,
    DemoSucceeded(CheckoutConfirmation),
    GatewaySucceeded(CheckoutConfirmation),
    Failed { reason: CheckoutFailure },
}

/// Options handed to the gateway's payment widget.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WidgetOptions {
    pub key_id: String,
    pub gateway_order_id: String,
    pub amount_minor_units: i64,
    pub currency: String,
    pub name: String,
    pub description: String,
    pub prefill_email: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InitiateOutcome {
    /// A payment is already being submitted; nothing was sent.
    AlreadyInFlight,
    Demo(CheckoutConfirmation),
    AwaitingGateway(WidgetOptions),
    Failed(CheckoutFailure),
}

#[derive(Debug, Clone)]
pub struct CustomerDetails {
    pub email: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    #[error("service not found")]
    ServiceNotFound { fallback: &'static str },

    #[error("no service loaded")]
    NoServiceLoaded,

    #[error("checkout already completed")]
    AlreadyCompleted,

    #[error("no payment is awaiting the gateway")]
    NotAwaitingPayment,

    #[error("a payment is in progress")]
    PaymentInFlight,

    #[error(transparent)]
    Selection(#[from] SelectionError),
}

/// What was charged, frozen when the widget opens.
#[derive(Debug)]
struct PendingPayment {
    intent: PaymentIntent,
    selection: Selection,
    customer: CustomerDetails,
}

#[derive(Debug)]
struct SessionInner {
    state: CheckoutState,
    selection: Option<Selection>,
    pending: Option<PendingPayment>,
}

impl SessionInner {
    /// The selection is frozen while a payment is being submitted.
    fn editable_selection(&mut self) -> Result<&mut Selection, CheckoutError> {
        if self.state == CheckoutState::Submitting {
            return Err(CheckoutError::PaymentInFlight);
        }
        self.selection.as_mut().ok_or(CheckoutError::NoServiceLoaded)
    }
}

pub struct CheckoutSession<B: CheckoutBackend> {
    backend: Arc<B>,
    catalog: Arc<Catalog>,
    policy: FuturePaymentPolicy,
    demo_delay: Duration,
    inner: Mutex<SessionInner>,
}

impl<B: CheckoutBackend> CheckoutSession<B> {
    pub fn new(backend: Arc<B>, catalog: Arc<Catalog>, policy: FuturePaymentPolicy) -> Self {
        Self {
            backend,
            catalog,
            policy,
            demo_delay: DEFAULT_DEMO_DELAY,
            inner: Mutex::new(SessionInner {
                state: CheckoutState::Idle,
                selection: None,
                pending: None,
            }),
        }
    }

    pub fn with_demo_delay(mut self, delay: Duration) -> Self {
        self.demo_delay = delay;
        self
    }

    pub async fn state(&self) -> CheckoutState {
        self.inner.lock().await.state.clone()
    }

    /// The pay control is usable when a service is loaded and nothing is in flight.
    pub async fn is_pay_enabled(&self) -> bool {
        matches!(
            self.inner.lock().await.state,
            CheckoutState::ServiceLoaded | CheckoutState::Failed { .. }
        )
    }

    pub async fn load_service(&self, service_id: &str) -> Result<Vec<SelectedAddOn>, CheckoutError> {
        let service = self
            .catalog
            .service(service_id)
            .ok_or(CheckoutError::ServiceNotFound {
                fallback: SERVICES_FALLBACK_ROUTE,
            })?;
        let selection = Selection::for_service(service, &self.catalog, self.policy);
        let addons = selection.addons().to_vec();

        let mut inner = self.inner.lock().await;
        if inner.state == CheckoutState::Submitting {
            return Err(CheckoutError::PaymentInFlight);
        }
        inner.selection = Some(selection);
        inner.pending = None;
        inner.state = CheckoutState::ServiceLoaded;
        Ok(addons)
    }

    pub async fn toggle_addon(
        &self,
        addon_id: &str,
        selected: bool,
    ) -> Result<Vec<SelectedAddOn>, CheckoutError> {
        let mut inner = self.inner.lock().await;
        let selection = inner.editable_selection()?;
        Ok(selection.toggle_addon(addon_id, selected)?.to_vec())
    }

    pub async fn set_addon_price(
        &self,
        addon_id: &str,
        price: Decimal,
    ) -> Result<Vec<SelectedAddOn>, CheckoutError> {
        let mut inner = self.inner.lock().await;
        let selection = inner.editable_selection()?;
        Ok(selection.set_addon_price(addon_id, price)?.to_vec())
    }

    pub async fn totals(&self) -> Result<CheckoutTotals, CheckoutError> {
        let inner = self.inner.lock().await;
        inner
            .selection
            .as_ref()
            .map(Selection::totals)
            .ok_or(CheckoutError::NoServiceLoaded)
    }

    /// The pay action. Only one payment can be in flight per session.
    #[instrument(skip(self, customer))]
    pub async fn initiate_payment(
        &self,
        customer: CustomerDetails,
    ) -> Result<InitiateOutcome, CheckoutError> {
        let selection = {
            let mut inner = self.inner.lock().await;
            match inner.state {
                CheckoutState::Submitting => return Ok(InitiateOutcome::AlreadyInFlight),
                CheckoutState::Idle => return Err(CheckoutError::NoServiceLoaded),
                CheckoutState::DemoSucceeded(_) | CheckoutState::GatewaySucceeded(_) => {
                    return Err(CheckoutError::AlreadyCompleted)
                }
                CheckoutState::ServiceLoaded | CheckoutState::Failed { .. } => {}
            }
            let selection = inner.selection.clone().ok_or(CheckoutError::NoServiceLoaded)?;
            inner.state = CheckoutState::Submitting;
            selection
        };

        let request = CreateOrderRequest {
            service_id: selection.service().id.clone(),
            addons: selection.to_choices(),
            currency: None,
            customer_email: Some(customer.email.clone()),
            customer_name: customer.name.clone(),
        };

        let intent = match self.backend.create_order(request).await {
            Ok(intent) => intent,
            Err(err) => {
                let reason = match err {
                    ServiceError::GatewayError(_) => CheckoutFailure::GatewayUnavailable,
                    other => CheckoutFailure::Rejected(other.response_message()),
                };
                warn!(?reason, "payment could not be started");
                self.fail(reason.clone()).await;
                return Ok(InitiateOutcome::Failed(reason));
            }
        };

        match intent.mode {
            PaymentModeKind::Demo => {
                tokio::time::sleep(self.demo_delay).await;
                let callback = GatewayCallback {
                    order_id: intent.gateway_order_id.clone(),
                    payment_id: Some(format!("pay_demo_{}", Uuid::new_v4().simple())),
                    signature: None,
                };
                let confirmation = self.persist(&selection, &customer, &intent, callback).await;
                self.inner.lock().await.state = CheckoutState::DemoSucceeded(confirmation.clone());
                info!(gateway_order_id = %intent.gateway_order_id, "demo payment completed");
                Ok(InitiateOutcome::Demo(confirmation))
            }
            PaymentModeKind::Live => {
                let options = WidgetOptions {
                    key_id: intent.key_id.clone().unwrap_or_default(),
                    gateway_order_id: intent.gateway_order_id.clone(),
                    amount_minor_units: intent.amount_minor_units,
                    currency: intent.currency.clone(),
                    name: selection.service().display_name.clone(),
                    description: selection.service().description.clone(),
                    prefill_email: customer.email.clone(),
                };
                let mut inner = self.inner.lock().await;
                if inner.state != CheckoutState::Submitting {
                    // dismissed while the gateway order was being created
                    return Ok(InitiateOutcome::Failed(CheckoutFailure::UserCancelled));
                }
                inner.pending = Some(PendingPayment {
                    intent,
                    selection,
                    customer,
                });
                Ok(InitiateOutcome::AwaitingGateway(options))
            }
        }
    }

    /// Gateway reported success. Money has moved, so the session reports
    /// success even when the order cannot be saved.
    #[instrument(skip(self, payment_id, signature))]
    pub async fn on_payment_success(
        &self,
        payment_id: String,
        signature: String,
    ) -> Result<CheckoutConfirmation, CheckoutError> {
        let PendingPayment {
            intent,
            selection,
            customer,
        } = {
            let mut inner = self.inner.lock().await;
            if inner.state != CheckoutState::Submitting {
                return Err(CheckoutError::NotAwaitingPayment);
            }
            inner.pending.take().ok_or(CheckoutError::NotAwaitingPayment)?
        };

        let callback = GatewayCallback {
            order_id: intent.gateway_order_id.clone(),
            payment_id: Some(payment_id),
            signature: Some(signature),
        };
        let confirmation = self.persist(&selection, &customer, &intent, callback).await;
        self.inner.lock().await.state = CheckoutState::GatewaySucceeded(confirmation.clone());
        Ok(confirmation)
    }

    /// The buyer closed the payment widget.
    pub async fn on_payment_dismissed(&self) -> CheckoutState {
        let mut inner = self.inner.lock().await;
        if inner.state == CheckoutState::Submitting {
            inner.pending = None;
            inner.state = CheckoutState::Failed {
                reason: CheckoutFailure::UserCancelled,
            };
            info!("payment dismissed by buyer");
        }
        inner.state.clone()
    }

    async fn fail(&self, reason: CheckoutFailure) {
        let mut inner = self.inner.lock().await;
        inner.pending = None;
        inner.state = CheckoutState::Failed { reason };
    }

    async fn persist(
        &self,
        selection: &Selection,
        customer: &CustomerDetails,
        intent: &PaymentIntent,
        payment: GatewayCallback,
    ) -> CheckoutConfirmation {
        let request = SaveOrderRequest {
            service_id: selection.service().id.clone(),
            addons: selection.to_choices(),
            currency: Some(intent.currency.clone()),
            customer_email: customer.email.clone(),
            customer_name: customer.name.clone(),
            payment,
        };

        let saved = match self.backend.save_order(request).await {
            Ok(order) => Some(order.id),
            Err(err) => {
                error!(
                    error = %err,
                    gateway_order_id = %intent.gateway_order_id,
                    "payment completed but order could not be saved"
                );
                None
            }
        };

        CheckoutConfirmation {
            gateway_order_id: intent.gateway_order_id.clone(),
            order_id: saved,
            persisted: saved.is_some(),
            totals: intent.totals,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex as StdMutex,
    };

    use crate::{
        gateway::GatewayError,
        models::{Order, OrderStatus},
        store::StoreError,
    };

    struct FakeBackend {
        mode: PaymentModeKind,
        creates: AtomicUsize,
        saves: AtomicUsize,
        fail_save: bool,
        fail_create: bool,
        create_delay: Duration,
        saved: StdMutex<Vec<SaveOrderRequest>>,
    }

    impl FakeBackend {
        fn new(mode: PaymentModeKind) -> Self {
            Self {
                mode,
                creates: AtomicUsize::new(0),
                saves: AtomicUsize::new(0),
                fail_save: false,
                fail_create: false,
                create_delay: Duration::ZERO,
                saved: StdMutex::new(Vec::new()),
            }
        }

        fn slow(mode: PaymentModeKind, create_delay: Duration) -> Self {
            Self {
                create_delay,
                ..Self::new(mode)
            }
        }
    }

    #[async_trait]
    impl CheckoutBackend for FakeBackend {
        async fn create_order(&self, request: CreateOrderRequest) -> Result<PaymentIntent, ServiceError> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            if !self.create_delay.is_zero() {
                tokio::time::sleep(self.create_delay).await;
            }
            if self.fail_create {
                return Err(ServiceError::GatewayError(GatewayError::InvalidResponse("down".into())));
            }
            let catalog = Catalog::builtin();
            let totals = Selection::from_choices(
                &catalog,
                &request.service_id,
                &request.addons,
                FuturePaymentPolicy::RecurringLater,
            )
            .unwrap()
            .totals();
            Ok(PaymentIntent {
                mode: self.mode,
                key_id: (self.mode == PaymentModeKind::Live).then(|| "rzp_live_abc".to_string()),
                gateway_order_id: "order_1".into(),
                amount_minor_units: 100,
                currency: "INR".into(),
                totals,
            })
        }

        async fn save_order(&self, request: SaveOrderRequest) -> Result<Order, ServiceError> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            self.saved.lock().unwrap().push(request.clone());
            if self.fail_save {
                return Err(StoreError::Unavailable("store down".into()).into());
            }
            let now = Utc::now();
            Ok(Order {
                id: Uuid::new_v4(),
                customer_email: request.customer_email,
                customer_name: request.customer_name,
                service_id: request.service_id,
                service_name: "x".into(),
                addons: vec![],
                one_time_total: dec!(1),
                monthly_total: dec!(0),
                amount_minor_units: 100,
                currency: "INR".into(),
                gateway_order_id: request.payment.order_id,
                gateway_payment_id: request.payment.payment_id,
                gateway_signature: request.payment.signature,
                payment_mode: self.mode,
                status: OrderStatus::Paid,
                created_at: now,
                updated_at: now,
            })
        }
    }

    fn session(backend: FakeBackend) -> (Arc<FakeBackend>, CheckoutSession<FakeBackend>) {
        let backend = Arc::new(backend);
        let session = CheckoutSession::new(
            backend.clone(),
            Arc::new(Catalog::builtin()),
            FuturePaymentPolicy::RecurringLater,
        );
        (backend, session)
    }

    fn buyer() -> CustomerDetails {
        CustomerDetails {
            email: "buyer@example.com".into(),
            name: None,
        }
    }

    #[tokio::test]
    async fn unknown_service_points_back_to_listing() {
        let (_, session) = session(FakeBackend::new(PaymentModeKind::Demo));
        assert_eq!(
            session.load_service("missing").await.unwrap_err(),
            CheckoutError::ServiceNotFound { fallback: "/services" }
        );
        assert_eq!(session.state().await, CheckoutState::Idle);
    }

    #[tokio::test]
    async fn paying_without_a_service_is_refused() {
        let (backend, session) = session(FakeBackend::new(PaymentModeKind::Demo));
        assert_eq!(
            session.initiate_payment(buyer()).await.unwrap_err(),
            CheckoutError::NoServiceLoaded
        );
        assert_eq!(backend.creates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn demo_payment_succeeds_after_simulated_delay() {
        let (backend, session) = session(FakeBackend::new(PaymentModeKind::Demo));
        session.load_service("digital-presence-audit").await.unwrap();

        let started = tokio::time::Instant::now();
        let outcome = session.initiate_payment(buyer()).await.unwrap();

        assert!(started.elapsed() >= DEFAULT_DEMO_DELAY);
        assert!(matches!(outcome, InitiateOutcome::Demo(ref c) if c.persisted));
        assert!(matches!(session.state().await, CheckoutState::DemoSucceeded(_)));
        assert_eq!(backend.saves.load(Ordering::SeqCst), 1);
        assert!(!session.is_pay_enabled().await);
    }

    #[tokio::test]
    async fn second_pay_click_while_submitting_is_ignored() {
        let (backend, session) = session(FakeBackend::new(PaymentModeKind::Live));
        session.load_service("digital-presence-audit").await.unwrap();

        let first = session.initiate_payment(buyer()).await.unwrap();
        assert!(matches!(first, InitiateOutcome::AwaitingGateway(_)));
        assert!(!session.is_pay_enabled().await);

        let second = session.initiate_payment(buyer()).await.unwrap();
        assert_eq!(second, InitiateOutcome::AlreadyInFlight);
        assert_eq!(backend.creates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_pay_clicks_during_demo_delay_create_one_order() {
        let (backend, session) = session(FakeBackend::new(PaymentModeKind::Demo));
        session.load_service("digital-presence-audit").await.unwrap();

        let (first, second) =
            tokio::join!(session.initiate_payment(buyer()), session.initiate_payment(buyer()));

        assert!(matches!(first.unwrap(), InitiateOutcome::Demo(_)));
        assert_eq!(second.unwrap(), InitiateOutcome::AlreadyInFlight);
        assert_eq!(backend.creates.load(Ordering::SeqCst), 1);
        assert_eq!(backend.saves.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_pay_clicks_while_gateway_order_is_created() {
        let (backend, session) = session(FakeBackend::slow(
            PaymentModeKind::Live,
            Duration::from_secs(2),
        ));
        session.load_service("digital-presence-audit").await.unwrap();

        let (first, second) =
            tokio::join!(session.initiate_payment(buyer()), session.initiate_payment(buyer()));

        assert!(matches!(first.unwrap(), InitiateOutcome::AwaitingGateway(_)));
        assert_eq!(second.unwrap(), InitiateOutcome::AlreadyInFlight);
        assert_eq!(backend.creates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn selection_is_frozen_while_payment_is_open() {
        let (backend, session) = session(FakeBackend::new(PaymentModeKind::Live));
        session.load_service("digital-presence-audit").await.unwrap();
        session.initiate_payment(buyer()).await.unwrap();

        assert_eq!(
            session.toggle_addon("competitor-deep-dive", true).await.unwrap_err(),
            CheckoutError::PaymentInFlight
        );
        assert_eq!(
            session.set_addon_price("seo-foundations", dec!(20000)).await.unwrap_err(),
            CheckoutError::PaymentInFlight
        );
        assert_eq!(
            session.load_service("web-platform-build").await.unwrap_err(),
            CheckoutError::PaymentInFlight
        );
        assert_eq!(session.state().await, CheckoutState::Submitting);
        assert_eq!(
            session.initiate_payment(buyer()).await.unwrap(),
            InitiateOutcome::AlreadyInFlight
        );
        assert_eq!(backend.creates.load(Ordering::SeqCst), 1);

        let confirmation = session
            .on_payment_success("pay_1".into(), "sig".into())
            .await
            .unwrap();
        assert_eq!(confirmation.totals.one_time_total, dec!(14999));
        let saved = backend.saved.lock().unwrap();
        assert_eq!(saved[0].service_id, "digital-presence-audit");
        assert!(saved[0].addons.is_empty());
    }

    #[tokio::test]
    async fn selection_can_change_again_after_dismissal() {
        let (_, session) = session(FakeBackend::new(PaymentModeKind::Live));
        session.load_service("digital-presence-audit").await.unwrap();
        session.initiate_payment(buyer()).await.unwrap();
        session.on_payment_dismissed().await;

        session.toggle_addon("competitor-deep-dive", true).await.unwrap();
        assert_eq!(session.totals().await.unwrap().one_time_total, dec!(44998));
    }

    #[tokio::test]
    async fn dismissal_fails_deterministically_and_reenables_pay() {
        let (_, session) = session(FakeBackend::new(PaymentModeKind::Live));
        session.load_service("digital-presence-audit").await.unwrap();
        session.initiate_payment(buyer()).await.unwrap();

        assert_eq!(
            session.on_payment_dismissed().await,
            CheckoutState::Failed { reason: CheckoutFailure::UserCancelled }
        );
        assert!(session.is_pay_enabled().await);
        assert_eq!(
            session.on_payment_success("pay_1".into(), "sig".into()).await.unwrap_err(),
            CheckoutError::NotAwaitingPayment
        );
    }

    #[tokio::test]
    async fn save_failure_after_payment_still_reports_success() {
        let mut backend = FakeBackend::new(PaymentModeKind::Live);
        backend.fail_save = true;
        let (_, session) = session(backend);
        session.load_service("digital-presence-audit").await.unwrap();
        session.initiate_payment(buyer()).await.unwrap();

        let confirmation = session
            .on_payment_success("pay_1".into(), "sig".into())
            .await
            .unwrap();
        assert!(!confirmation.persisted);
        assert!(matches!(session.state().await, CheckoutState::GatewaySucceeded(_)));
    }

    #[tokio::test]
    async fn gateway_outage_allows_manual_retry() {
        let mut backend = FakeBackend::new(PaymentModeKind::Live);
        backend.fail_create = true;
        let (backend, session) = session(backend);
        session.load_service("digital-presence-audit").await.unwrap();

        let outcome = session.initiate_payment(buyer()).await.unwrap();
        assert_eq!(outcome, InitiateOutcome::Failed(CheckoutFailure::GatewayUnavailable));
        assert!(session.is_pay_enabled().await);

        session.initiate_payment(buyer()).await.unwrap();
        assert_eq!(backend.creates.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn selection_edits_update_totals() {
        let (_, session) = session(FakeBackend::new(PaymentModeKind::Demo));
        session.load_service("digital-presence-audit").await.unwrap();
        session.toggle_addon("monthly-retainer", true).await.unwrap();
        session.toggle_addon("competitor-deep-dive", true).await.unwrap();

        let totals = session.totals().await.unwrap();
        assert_eq!(totals.one_time_total, dec!(44998));
        assert_eq!(totals.monthly_total, dec!(9999));
    }
}
