use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};

use super::{EmailMessage, Mailer, NotificationError};

pub const RESEND_API_BASE: &str = "https://api.resend.com";

/// Client for the Resend transactional email API.
#[derive(Clone)]
pub struct ResendMailer {
    http: Client,
    base_url: String,
    api_key: String,
}

impl ResendMailer {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, NotificationError> {
        Ok(Self {
            http: Client::builder().timeout(timeout).build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    #[instrument(skip_all, fields(subject = %message.subject))]
    async fn send(&self, message: EmailMessage) -> Result<(), NotificationError> {
        let response = self
            .http
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotificationError::Api {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        debug!("email accepted by provider");
        Ok(())
    }
}
