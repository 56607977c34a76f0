//! Server side of checkout: payment intents and order persistence.
//!
//! Totals are always recomputed from the catalog; amounts posted by the
//! browser are never trusted.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::{
    catalog::Catalog,
    selection::{to_minor_units, AddOnChoice, CheckoutTotals, FuturePaymentPolicy, Selection, SelectionError},
    validate_currency, validate_email_shape, validate_not_blank,
};
use crate::{
    config::GatewayCredentials,
    errors::ServiceError,
    gateway::{verify_payment_signature, CreateGatewayOrder, PaymentGateway},
    models::{Order, OrderStatus, PaymentModeKind},
    repositories::{OrderRepository, PaymentRecord},
};

pub const DEMO_ORDER_PREFIX: &str = "order_demo_";

/// How payments are taken, fixed at startup.
#[derive(Clone)]
pub enum Payments {
    Live {
        gateway: Arc<dyn PaymentGateway>,
        credentials: GatewayCredentials,
    },
    Demo,
}

impl Payments {
    pub fn kind(&self) -> PaymentModeKind {
        match self {
            Payments::Live { .. } => PaymentModeKind::Live,
            Payments::Demo => PaymentModeKind::Demo,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct QuoteRequest {
    #[validate(custom = "validate_not_blank")]
    pub service_id: String,
    #[serde(default)]
    pub addons: Vec<AddOnChoice>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Quote {
    pub service_id: String,
    pub totals: CheckoutTotals,
    /// What would be charged today, in minor units
    pub amount_minor_units: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    #[validate(custom = "validate_not_blank")]
    pub service_id: String,
    #[serde(default)]
    pub addons: Vec<AddOnChoice>,
    /// Must match the configured store currency when sent
    #[validate(custom = "validate_currency")]
    pub currency: Option<String>,
    #[serde(default)]
    #[validate(custom = "validate_email_shape")]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
}

/// Everything the browser needs to open the payment widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PaymentIntent {
    pub mode: PaymentModeKind,
    /// Public gateway key; absent in demo mode
    pub key_id: Option<String>,
    pub gateway_order_id: String,
    pub amount_minor_units: i64,
    pub currency: String,
    pub totals: CheckoutTotals,
}

/// Fields the gateway widget hands back after a successful payment.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GatewayCallback {
    pub order_id: String,
    pub payment_id: Option<String>,
    pub signature: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SaveOrderRequest {
    #[validate(custom = "validate_not_blank")]
    pub service_id: String,
    #[serde(default)]
    pub addons: Vec<AddOnChoice>,
    #[validate(custom = "validate_currency")]
    pub currency: Option<String>,
    #[validate(custom = "validate_email_shape")]
    pub customer_email: String,
    pub customer_name: Option<String>,
    pub payment: GatewayCallback,
}

/// What the checkout session needs from the server.
#[async_trait]
pub trait CheckoutBackend: Send + Sync {
    async fn create_order(&self, request: CreateOrderRequest) -> Result<PaymentIntent, ServiceError>;
    async fn save_order(&self, request: SaveOrderRequest) -> Result<Order, ServiceError>;
}

impl From<SelectionError> for ServiceError {
    fn from(err: SelectionError) -> Self {
        match err {
            SelectionError::UnknownService(_) => ServiceError::NotFound(err.to_string()),
            SelectionError::UnknownAddOn(_) | SelectionError::AmountOutOfRange(_) => {
                ServiceError::ValidationError(err.to_string())
            }
        }
    }
}

#[derive(Clone)]
pub struct CheckoutService {
    catalog: Arc<Catalog>,
    orders: OrderRepository,
    payments: Payments,
    currency: String,
    policy: FuturePaymentPolicy,
}

impl CheckoutService {
    pub fn new(
        catalog: Arc<Catalog>,
        orders: OrderRepository,
        payments: Payments,
        currency: impl Into<String>,
        policy: FuturePaymentPolicy,
    ) -> Self {
        Self {
            catalog,
            orders,
            payments,
            currency: currency.into(),
            policy,
        }
    }

    pub fn mode(&self) -> PaymentModeKind {
        self.payments.kind()
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn policy(&self) -> FuturePaymentPolicy {
        self.policy
    }

    fn selection(&self, service_id: &str, addons: &[AddOnChoice]) -> Result<Selection, ServiceError> {
        Ok(Selection::from_choices(&self.catalog, service_id, addons, self.policy)?)
    }

    /// Prices are held in one currency; a different one would charge the
    /// same number in the wrong unit.
    fn accepted_currency(&self, requested: Option<&str>) -> Result<String, ServiceError> {
        match requested.map(str::trim) {
            None => Ok(self.currency.clone()),
            Some(code) if code.eq_ignore_ascii_case(&self.currency) => Ok(self.currency.clone()),
            Some(code) => Err(ServiceError::ValidationError(format!(
                "currency {} is not accepted; prices are in {}",
                code, self.currency
            ))),
        }
    }

    /// Totals for a selection, as the server will charge them.
    pub fn quote(&self, request: &QuoteRequest) -> Result<Quote, ServiceError> {
        request.validate()?;
        let selection = self.selection(&request.service_id, &request.addons)?;
        let totals = selection.totals();
        Ok(Quote {
            service_id: request.service_id.clone(),
            totals,
            amount_minor_units: to_minor_units(totals.one_time_total)?,
            currency: self.currency.clone(),
        })
    }

    /// Opens a payment intent and stores it as a `created` order, which is
    /// the only row a later payment can settle.
    #[instrument(skip(self, request), fields(service_id = %request.service_id, mode = %self.mode()))]
    pub async fn create_payment_intent(
        &self,
        request: CreateOrderRequest,
    ) -> Result<PaymentIntent, ServiceError> {
        request.validate()?;
        let currency = self.accepted_currency(request.currency.as_deref())?;
        let selection = self.selection(&request.service_id, &request.addons)?;
        let totals = selection.totals();
        let amount_minor_units = to_minor_units(totals.one_time_total)?;

        let intent = match &self.payments {
            Payments::Demo => {
                let gateway_order_id = format!("{}{}", DEMO_ORDER_PREFIX, Uuid::new_v4().simple());
                info!(%gateway_order_id, amount_minor_units, "demo payment intent created");
                PaymentIntent {
                    mode: PaymentModeKind::Demo,
                    key_id: None,
                    gateway_order_id,
                    amount_minor_units,
                    currency,
                    totals,
                }
            }
            Payments::Live {
                gateway,
                credentials,
            } => {
                let order = gateway
                    .create_order(CreateGatewayOrder {
                        amount: amount_minor_units,
                        currency: currency.clone(),
                        receipt: format!("rcpt_{}", Uuid::new_v4().simple()),
                    })
                    .await?;
                if order.amount != amount_minor_units {
                    warn!(expected = amount_minor_units, got = order.amount, "gateway changed the order amount");
                    return Err(ServiceError::InternalError(
                        "gateway order amount does not match the selection".into(),
                    ));
                }
                PaymentIntent {
                    mode: PaymentModeKind::Live,
                    key_id: Some(credentials.key_id.clone()),
                    gateway_order_id: order.id,
                    amount_minor_units,
                    currency,
                    totals,
                }
            }
        };

        let now = Utc::now();
        let pending = Order {
            id: Uuid::new_v4(),
            customer_email: request
                .customer_email
                .map(|email| email.trim().to_string())
                .unwrap_or_default(),
            customer_name: clean_name(request.customer_name),
            service_id: selection.service().id.clone(),
            service_name: selection.service().display_name.clone(),
            addons: selection.order_addons(),
            one_time_total: totals.one_time_total,
            monthly_total: totals.monthly_total,
            amount_minor_units,
            currency: intent.currency.clone(),
            gateway_order_id: intent.gateway_order_id.clone(),
            gateway_payment_id: None,
            gateway_signature: None,
            payment_mode: intent.mode,
            status: OrderStatus::Created,
            created_at: now,
            updated_at: now,
        };
        let stored = self.orders.create(&pending).await?;
        info!(order_id = %stored.id, gateway_order_id = %stored.gateway_order_id, "order created");
        Ok(intent)
    }

    /// Checks the gateway callback; returns the payment id and signature to keep.
    fn verify_callback(
        &self,
        payment: &GatewayCallback,
    ) -> Result<(Option<String>, Option<String>), ServiceError> {
        match &self.payments {
            Payments::Live { credentials, .. } => {
                let (Some(payment_id), Some(signature)) =
                    (payment.payment_id.as_deref(), payment.signature.as_deref())
                else {
                    return Err(ServiceError::PaymentVerificationFailed(
                        "payment id and signature are required".into(),
                    ));
                };
                if !verify_payment_signature(
                    &payment.order_id,
                    payment_id,
                    signature,
                    &credentials.key_secret,
                ) {
                    warn!("payment signature mismatch; order not recorded");
                    return Err(ServiceError::PaymentVerificationFailed(
                        "signature does not match".into(),
                    ));
                }
                Ok((Some(payment_id.to_string()), Some(signature.to_string())))
            }
            Payments::Demo => {
                if !payment.order_id.starts_with(DEMO_ORDER_PREFIX) {
                    return Err(ServiceError::PaymentVerificationFailed(
                        "demo mode only accepts demo orders".into(),
                    ));
                }
                Ok((payment.payment_id.clone(), None))
            }
        }
    }

    /// Settles the order created for `payment.order_id`. The callback must
    /// verify and the posted selection must be the one the intent charged;
    /// an order can be settled once.
    #[instrument(skip(self, request), fields(service_id = %request.service_id, gateway_order_id = %request.payment.order_id))]
    pub async fn record_payment(&self, request: SaveOrderRequest) -> Result<Order, ServiceError> {
        request.validate()?;
        self.accepted_currency(request.currency.as_deref())?;
        let selection = self.selection(&request.service_id, &request.addons)?;
        let amount_minor_units = to_minor_units(selection.totals().one_time_total)?;
        let (payment_id, signature) = self.verify_callback(&request.payment)?;

        let pending = self
            .orders
            .find_by_gateway_order(&request.payment.order_id)
            .await?
            .ok_or_else(|| {
                warn!("no payment intent on record for this gateway order");
                ServiceError::PaymentVerificationFailed("unknown payment order".into())
            })?;

        let next = pending.status.transition(OrderStatus::Paid)?;
        if pending.service_id != selection.service().id
            || pending.amount_minor_units != amount_minor_units
            || pending.payment_mode != self.mode()
        {
            warn!(
                order_id = %pending.id,
                intent_service = %pending.service_id,
                intent_amount = pending.amount_minor_units,
                posted_amount = amount_minor_units,
                "payment does not match its intent"
            );
            return Err(ServiceError::PaymentVerificationFailed(
                "order does not match the payment intent".into(),
            ));
        }

        let payment = PaymentRecord {
            customer_email: request.customer_email.trim().to_string(),
            customer_name: clean_name(request.customer_name),
            payment_id,
            signature,
        };
        let saved = self.orders.record_payment(pending.id, &payment).await?;
        info!(order_id = %saved.id, mode = %saved.payment_mode, from = %pending.status, to = %next, "order paid");
        Ok(saved)
    }
}

fn clean_name(name: Option<String>) -> Option<String> {
    name.map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
}

#[async_trait]
impl CheckoutBackend for CheckoutService {
    async fn create_order(&self, request: CreateOrderRequest) -> Result<PaymentIntent, ServiceError> {
        self.create_payment_intent(request).await
    }

    async fn save_order(&self, request: SaveOrderRequest) -> Result<Order, ServiceError> {
        self.record_payment(request).await
    }
}
