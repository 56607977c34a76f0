use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

use super::TransitionError;
use crate::services::catalog::BillingType;

/// Order lifecycle.
///
/// `created -> attempted -> paid -> refunded`, with `failed` and `cancelled`
/// reachable before payment. `failed -> created` resets an order so the
/// customer can retry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrderStatus {
    Created,
    Attempted,
    Paid,
    Refunded,
    Failed,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Refunded | OrderStatus::Cancelled)
    }

    /// Statuses counted as "pending payment" on the admin dashboard.
    pub fn is_pending_payment(&self) -> bool {
        matches!(self, OrderStatus::Created | OrderStatus::Attempted)
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Created, Attempted | Paid | Failed | Cancelled)
                | (Attempted, Paid | Failed | Cancelled)
                | (Paid, Refunded)
                | (Failed, Created)
        )
    }

    pub fn transition(self, next: OrderStatus) -> Result<OrderStatus, TransitionError> {
        if self == next {
            return Err(TransitionError::Unchanged(self.to_string()));
        }
        if !self.can_transition_to(next) {
            return Err(TransitionError::NotAllowed {
                from: self.to_string(),
                to: next.to_string(),
            });
        }
        Ok(next)
    }
}

/// Whether an order moved real money.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentModeKind {
    Live,
    Demo,
}

/// Snapshot of an add-on as it was bought.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderAddOn {
    pub id: String,
    pub name: String,
    #[schema(value_type = String, example = "9999")]
    pub price: Decimal,
    pub billing_type: BillingType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub customer_email: String,
    #[serde(default)]
    pub customer_name: Option<String>,
    pub service_id: String,
    pub service_name: String,
    #[serde(default)]
    pub addons: Vec<OrderAddOn>,
    #[schema(value_type = String, example = "44998")]
    pub one_time_total: Decimal,
    #[schema(value_type = String, example = "9999")]
    pub monthly_total: Decimal,
    /// Charged amount in minor units (paise for INR)
    pub amount_minor_units: i64,
    pub currency: String,
    pub gateway_order_id: String,
    #[serde(default)]
    pub gateway_payment_id: Option<String>,
    #[serde(default)]
    pub gateway_signature: Option<String>,
    pub payment_mode: PaymentModeKind,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Amount that counts towards revenue, in major units.
    pub fn charged_amount(&self) -> Decimal {
        self.one_time_total
    }

    pub fn counts_as_revenue(&self) -> bool {
        self.status == OrderStatus::Paid && self.payment_mode == PaymentModeKind::Live
    }
}
