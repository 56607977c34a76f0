//! Payment-gateway collaborator.
//!
//! The server only ever creates gateway orders and verifies the signature
//! the gateway hands back to the browser after a successful payment. The
//! payment dialog itself runs client-side.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

pub mod razorpay;

pub use razorpay::RazorpayClient;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateGatewayOrder {
    /// Amount in minor units (paise)
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("gateway rejected request (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("gateway returned an unexpected response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(&self, request: CreateGatewayOrder) -> Result<GatewayOrder, GatewayError>;
}

/// Signature the gateway attaches to a successful payment:
/// `hex(HMAC-SHA256(secret, "<order_id>|<payment_id>"))`.
pub fn payment_signature(
    gateway_order_id: &str,
    gateway_payment_id: &str,
    key_secret: &str,
) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(key_secret.as_bytes()).ok()?;
    mac.update(format!("{}|{}", gateway_order_id, gateway_payment_id).as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Checks the signature the checkout widget received from the gateway.
pub fn verify_payment_signature(
    gateway_order_id: &str,
    gateway_payment_id: &str,
    signature: &str,
    key_secret: &str,
) -> bool {
    payment_signature(gateway_order_id, gateway_payment_id, key_secret)
        .map(|expected| constant_time_eq(&expected, signature.trim()))
        .unwrap_or(false)
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}
