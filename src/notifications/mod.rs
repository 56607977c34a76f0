//! Transactional email.
//!
//! Emails are a side effect of lead capture, never part of it: [`Notifier`]
//! sends on background tasks and only logs failures.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn, Instrument};

use crate::models::ConsultationRequest;

pub mod resend;
pub mod templates;

pub use resend::ResendMailer;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("email request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("email provider rejected message (status {status}): {body}")]
    Api { status: u16, body: String },
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), NotificationError>;
}

/// Mailer used when no email provider key is configured.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), NotificationError> {
        info!(
            to = ?message.to,
            subject = %message.subject,
            "email provider not configured; message logged only"
        );
        Ok(())
    }
}

/// Best-effort dispatcher for the lead-capture emails.
#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    from: String,
    internal_recipient: String,
}

impl Notifier {
    pub fn new(
        mailer: Arc<dyn Mailer>,
        from: impl Into<String>,
        internal_recipient: impl Into<String>,
    ) -> Self {
        Self {
            mailer,
            from: from.into(),
            internal_recipient: internal_recipient.into(),
        }
    }

    /// Sends `message` on a background task. The returned handle never
    /// yields an error; failures are logged inside the task.
    pub fn dispatch(&self, kind: &'static str, message: EmailMessage) -> JoinHandle<()> {
        let mailer = Arc::clone(&self.mailer);
        let span = tracing::info_span!("email", kind);
        tokio::spawn(
            async move {
                match mailer.send(message).await {
                    Ok(()) => info!("email sent"),
                    Err(err) => warn!(error = %err, "email delivery failed"),
                }
            }
            .instrument(span),
        )
    }

    /// Customer confirmation plus internal alert for a new lead.
    pub fn consultation_received(&self, request: &ConsultationRequest) -> Vec<JoinHandle<()>> {
        vec![
            self.dispatch(
                "customer_confirmation",
                templates::customer_confirmation(&self.from, request),
            ),
            self.dispatch(
                "internal_alert",
                templates::internal_alert(&self.from, &self.internal_recipient, request),
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Mutex;
    use uuid::Uuid;

    use crate::models::{ConsultationPriority, ConsultationSource, ConsultationStatus};

    #[derive(Default)]
    struct Recording {
        sent: Mutex<Vec<EmailMessage>>,
        fail: bool,
    }

    #[async_trait]
    impl Mailer for Recording {
        async fn send(&self, message: EmailMessage) -> Result<(), NotificationError> {
            if self.fail {
                return Err(NotificationError::Api {
                    status: 422,
                    body: "invalid from".into(),
                });
            }
            self.sent.lock().unwrap().push(message);
            Ok(())
        }
    }

    fn lead() -> ConsultationRequest {
        let now = Utc::now();
        ConsultationRequest {
            id: Uuid::new_v4(),
            first_name: "Jane".into(),
            last_name: None,
            email: "jane@x.com".into(),
            designation: None,
            company_name: None,
            business_field: None,
            selected_services: vec![],
            other_service_description: None,
            status: ConsultationStatus::Pending,
            priority: ConsultationPriority::Medium,
            source: ConsultationSource::Website,
            created_at: now,
            updated_at: now,
            notes: None,
        }
    }

    #[tokio::test]
    async fn lead_triggers_two_emails() {
        let mailer = Arc::new(Recording::default());
        let notifier = Notifier::new(mailer.clone(), "hello@firm.example", "leads@firm.example");

        for handle in notifier.consultation_received(&lead()) {
            handle.await.unwrap();
        }

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().any(|m| m.to == vec!["jane@x.com".to_string()]));
        assert!(sent.iter().any(|m| m.to == vec!["leads@firm.example".to_string()]));
    }

    #[tokio::test]
    async fn failures_stay_inside_the_task() {
        let mailer = Arc::new(Recording {
            fail: true,
            ..Default::default()
        });
        let notifier = Notifier::new(mailer, "hello@firm.example", "leads@firm.example");

        for handle in notifier.consultation_received(&lead()) {
            assert!(handle.await.is_ok());
        }
    }
}
