use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::{validate_email_shape, validate_not_blank};
use crate::{
    errors::ServiceError,
    models::{
        ConsultationPriority, ConsultationRequest, ConsultationSource, ConsultationStatus,
    },
    notifications::Notifier,
    repositories::ConsultationRepository,
};

/// Lead form submission
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct ConsultationInput {
    #[validate(custom = "validate_not_blank")]
    pub first_name: String,
    pub last_name: Option<String>,
    #[validate(custom = "validate_email_shape")]
    pub email: String,
    pub designation: Option<String>,
    pub company_name: Option<String>,
    pub business_field: Option<String>,
    #[serde(default)]
    pub selected_services: Vec<String>,
    #[validate(length(max = 2000))]
    pub other_service_description: Option<String>,
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Clone)]
pub struct ConsultationService {
    repository: ConsultationRepository,
    notifier: Notifier,
}

impl ConsultationService {
    pub fn new(repository: ConsultationRepository, notifier: Notifier) -> Self {
        Self {
            repository,
            notifier,
        }
    }

    /// Records a lead, then sends the two notification emails in the
    /// background. Only validation and persistence can fail the call.
    #[instrument(skip(self, input))]
    pub async fn submit(&self, input: ConsultationInput) -> Result<ConsultationRequest, ServiceError> {
        input.validate()?;

        let now = Utc::now();
        let request = ConsultationRequest {
            id: Uuid::new_v4(),
            first_name: input.first_name.trim().to_string(),
            last_name: clean(input.last_name),
            email: input.email.trim().to_string(),
            designation: clean(input.designation),
            company_name: clean(input.company_name),
            business_field: clean(input.business_field),
            selected_services: input
                .selected_services
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            other_service_description: clean(input.other_service_description),
            status: ConsultationStatus::Pending,
            priority: ConsultationPriority::Medium,
            source: ConsultationSource::Website,
            created_at: now,
            updated_at: now,
            notes: None,
        };

        let saved = self.repository.create(&request).await?;
        info!(consultation_id = %saved.id, "consultation request recorded");

        self.notifier.consultation_received(&saved);
        Ok(saved)
    }

    pub async fn list(&self) -> Result<Vec<ConsultationRequest>, ServiceError> {
        Ok(self.repository.list_recent().await?)
    }

    /// Moves a request along its lifecycle. Refused moves write nothing.
    #[instrument(skip(self, notes), fields(consultation_id = %id, status = %status))]
    pub async fn update_status(
        &self,
        id: Uuid,
        status: ConsultationStatus,
        notes: Option<String>,
    ) -> Result<ConsultationRequest, ServiceError> {
        let current = self
            .repository
            .find(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("consultation request {}", id)))?;

        let next = current.status.transition(status)?;
        let updated = self.repository.set_status(id, next, notes).await?;
        info!(from = %current.status, to = %next, "consultation status updated");
        Ok(updated)
    }

    #[instrument(skip(self), fields(consultation_id = %id))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        self.repository.delete(id).await?;
        info!("consultation request deleted");
        Ok(())
    }
}
