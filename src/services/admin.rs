//! Back-office aggregation and status management.
//!
//! The dashboard is three independent fetches (orders, consultations,
//! users) run concurrently. A failing fetch blanks its own section and
//! nothing else.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{consultations::ConsultationService, filters::ListFilter, validate_email_shape};
use crate::{
    auth::{AdminPolicy, AuthProvider, Confirmation, PERMANENT_BAN_DURATION},
    errors::ServiceError,
    models::{ConsultationRequest, ConsultationStatus, Order, OrderStatus, UserAccount},
    repositories::OrderRepository,
};

pub const RESET_PASSWORD_PATH: &str = "/auth/reset-password";

/// One dashboard section: either data or the reason it is missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Section<T> {
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> Section<T> {
    fn from_result(result: Result<T, ServiceError>) -> Self {
        match result {
            Ok(data) => Section {
                data: Some(data),
                error: None,
            },
            Err(err) => Section {
                data: None,
                error: Some(err.response_message()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AdminStats {
    /// Sum of one-time totals over live, paid orders
    #[schema(value_type = String)]
    pub total_revenue: Decimal,
    pub total_orders: usize,
    pub total_consultations: usize,
    pub pending_consultations: usize,
    pub pending_payments: usize,
    /// `None` when the user list could not be loaded
    pub active_users: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Dashboard {
    pub stats: Section<AdminStats>,
    pub orders: Section<Vec<Order>>,
    pub consultations: Section<Vec<ConsultationRequest>>,
    pub users: Section<Vec<UserAccount>>,
}

pub fn compute_stats(
    orders: &[Order],
    consultations: &[ConsultationRequest],
    users: Option<&[UserAccount]>,
) -> AdminStats {
    let now = Utc::now();
    AdminStats {
        total_revenue: orders
            .iter()
            .filter(|o| o.counts_as_revenue())
            .map(Order::charged_amount)
            .sum(),
        total_orders: orders.len(),
        total_consultations: consultations.len(),
        pending_consultations: consultations
            .iter()
            .filter(|c| c.status == ConsultationStatus::Pending)
            .count(),
        pending_payments: orders
            .iter()
            .filter(|o| o.status.is_pending_payment())
            .count(),
        active_users: users.map(|users| {
            users
                .iter()
                .filter(|u| u.banned_until.map_or(true, |until| until <= now))
                .count()
        }),
    }
}

#[derive(Clone)]
pub struct AdminService {
    orders: OrderRepository,
    consultations: ConsultationService,
    auth: Arc<dyn AuthProvider>,
    policy: AdminPolicy,
    site_base_url: String,
}

impl AdminService {
    pub fn new(
        orders: OrderRepository,
        consultations: ConsultationService,
        auth: Arc<dyn AuthProvider>,
        policy: AdminPolicy,
        site_base_url: impl Into<String>,
    ) -> Self {
        Self {
            orders,
            consultations,
            auth,
            policy,
            site_base_url: site_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn fetch_orders(&self) -> Result<Vec<Order>, ServiceError> {
        Ok(self.orders.list_recent().await?)
    }

    async fn fetch_consultations(&self) -> Result<Vec<ConsultationRequest>, ServiceError> {
        self.consultations.list().await
    }

    async fn fetch_users(&self) -> Result<Vec<UserAccount>, ServiceError> {
        let records = self.auth.list_users().await?;
        Ok(records
            .into_iter()
            .map(|record| {
                let email = record.email.unwrap_or_default();
                UserAccount {
                    role: self.policy.role_for(&email),
                    id: record.id,
                    email,
                    created_at: record.created_at,
                    last_sign_in_at: record.last_sign_in_at,
                    sign_in_count: record.sign_in_count,
                    banned_until: record.banned_until,
                }
            })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn load_dashboard(&self) -> Dashboard {
        let (orders, consultations, users) = tokio::join!(
            self.fetch_orders(),
            self.fetch_consultations(),
            self.fetch_users()
        );

        for (section, err) in [
            ("orders", orders.as_ref().err()),
            ("consultations", consultations.as_ref().err()),
            ("users", users.as_ref().err()),
        ] {
            if let Some(err) = err {
                warn!(section, error = %err, "dashboard section failed to load");
            }
        }

        let stats = match (&orders, &consultations) {
            (Ok(o), Ok(c)) => Ok(compute_stats(o, c, users.as_deref().ok())),
            (Err(err), _) | (_, Err(err)) => Err(ServiceError::InternalError(format!(
                "statistics unavailable: {}",
                err.response_message()
            ))),
        };

        Dashboard {
            stats: Section::from_result(stats),
            orders: Section::from_result(orders),
            consultations: Section::from_result(consultations),
            users: Section::from_result(users),
        }
    }

    pub async fn stats(&self) -> Result<AdminStats, ServiceError> {
        let (orders, consultations, users) = tokio::join!(
            self.fetch_orders(),
            self.fetch_consultations(),
            self.fetch_users()
        );
        Ok(compute_stats(&orders?, &consultations?, users.as_deref().ok()))
    }

    pub async fn orders(&self, filter: &ListFilter) -> Result<Vec<Order>, ServiceError> {
        Ok(filter.apply(self.fetch_orders().await?))
    }

    pub async fn consultations(
        &self,
        filter: &ListFilter,
    ) -> Result<Vec<ConsultationRequest>, ServiceError> {
        Ok(filter.apply(self.fetch_consultations().await?))
    }

    pub async fn users(&self, filter: &ListFilter) -> Result<Vec<UserAccount>, ServiceError> {
        Ok(filter.apply(self.fetch_users().await?))
    }

    /// Applies an order status change. Refused changes write nothing.
    #[instrument(skip(self), fields(order_id = %id, status = %status))]
    pub async fn update_order_status(&self, id: Uuid, status: OrderStatus) -> Result<Order, ServiceError> {
        let current = self
            .orders
            .find(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {}", id)))?;

        let next = current.status.transition(status)?;
        let updated = self.orders.set_status(id, next).await?;
        info!(from = %current.status, to = %next, "order status updated");
        Ok(updated)
    }

    pub async fn update_consultation_status(
        &self,
        id: Uuid,
        status: ConsultationStatus,
        notes: Option<String>,
    ) -> Result<ConsultationRequest, ServiceError> {
        self.consultations.update_status(id, status, notes).await
    }

    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn delete_order(&self, id: Uuid) -> Result<(), ServiceError> {
        self.orders.delete(id).await?;
        info!("order deleted");
        Ok(())
    }

    pub async fn delete_consultation(&self, id: Uuid) -> Result<(), ServiceError> {
        self.consultations.delete(id).await
    }

    /// Bans a user for good. Only callable with an explicit confirmation.
    #[instrument(skip(self, _confirmed))]
    pub async fn suspend_user(&self, user_id: &str, _confirmed: Confirmation) -> Result<(), ServiceError> {
        if user_id.trim().is_empty() {
            return Err(ServiceError::ValidationError("user_id is required".into()));
        }
        self.auth.ban_user(user_id.trim(), PERMANENT_BAN_DURATION).await?;
        info!(user_id, "user suspended");
        Ok(())
    }

    /// Sends a password recovery email. Only callable with an explicit confirmation.
    #[instrument(skip(self, email, _confirmed))]
    pub async fn reset_password(&self, email: &str, _confirmed: Confirmation) -> Result<(), ServiceError> {
        validate_email_shape(email).map_err(|_| {
            ServiceError::ValidationError("email must look like local@domain.tld".into())
        })?;
        let redirect_to = format!("{}{}", self.site_base_url, RESET_PASSWORD_PATH);
        self.auth
            .reset_password_for_email(email.trim(), &redirect_to)
            .await?;
        info!("password reset requested");
        Ok(())
    }
}
