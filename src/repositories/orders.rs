use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use super::BaseRepository;
use crate::{
    models::{Order, OrderStatus},
    store::{Query, RecordStore, StoreError, Table},
};

/// Payment details captured when an intent is settled.
#[derive(Debug, Clone)]
pub struct PaymentRecord {
    pub customer_email: String,
    pub customer_name: Option<String>,
    pub payment_id: Option<String>,
    pub signature: Option<String>,
}

/// Repository for persisted orders
#[derive(Clone)]
pub struct OrderRepository {
    base: BaseRepository,
}

impl OrderRepository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            base: BaseRepository::new(store, Table::Orders),
        }
    }

    pub async fn create(&self, order: &Order) -> Result<Order, StoreError> {
        self.base.insert(order).await
    }

    /// All orders, newest first
    pub async fn list_recent(&self) -> Result<Vec<Order>, StoreError> {
        self.base.select(Query::newest_first()).await
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        self.base.find(&id.to_string()).await
    }

    /// The order a payment intent was issued for.
    pub async fn find_by_gateway_order(&self, gateway_order_id: &str) -> Result<Option<Order>, StoreError> {
        Ok(self
            .base
            .select(Query::new().eq("gateway_order_id", gateway_order_id).limit(1))
            .await?
            .into_iter()
            .next())
    }

    /// Marks an order paid and attaches the gateway's payment details.
    pub async fn record_payment(&self, id: Uuid, payment: &PaymentRecord) -> Result<Order, StoreError> {
        self.base
            .patch(
                &id.to_string(),
                json!({
                    "status": OrderStatus::Paid,
                    "customer_email": payment.customer_email,
                    "customer_name": payment.customer_name,
                    "gateway_payment_id": payment.payment_id,
                    "gateway_signature": payment.signature,
                    "updated_at": Utc::now(),
                }),
            )
            .await
    }

    pub async fn set_status(&self, id: Uuid, status: OrderStatus) -> Result<Order, StoreError> {
        self.base
            .patch(
                &id.to_string(),
                json!({ "status": status, "updated_at": Utc::now() }),
            )
            .await
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        self.base.delete(&id.to_string()).await
    }
}
