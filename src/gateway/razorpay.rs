use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{info, instrument};

use super::{CreateGatewayOrder, GatewayError, GatewayOrder, PaymentGateway};

pub const RAZORPAY_API_BASE: &str = "https://api.razorpay.com";

/// Minimal Razorpay Orders API client (basic auth with key id and secret).
#[derive(Clone)]
pub struct RazorpayClient {
    http: Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl RazorpayClient {
    pub fn new(
        base_url: impl Into<String>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        Ok(Self {
            http: Client::builder().timeout(timeout).build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            key_id: key_id.into(),
            key_secret: key_secret.into(),
        })
    }
}

#[async_trait]
impl PaymentGateway for RazorpayClient {
    #[instrument(skip(self, request), fields(receipt = %request.receipt, amount = request.amount))]
    async fn create_order(&self, request: CreateGatewayOrder) -> Result<GatewayOrder, GatewayError> {
        let resp = self
            .http
            .post(format!("{}/v1/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(GatewayError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let order: GatewayOrder = serde_json::from_str(&body)
            .map_err(|e| GatewayError::InvalidResponse(format!("{e}; body={body}")))?;
        info!(gateway_order_id = %order.id, "gateway order created");
        Ok(order)
    }
}
