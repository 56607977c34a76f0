use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

use super::TransitionError;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConsultationStatus {
    Pending,
    Contacted,
    InProgress,
    Completed,
    Cancelled,
}

impl ConsultationStatus {
    /// Position on the forward track; `None` for `cancelled`, which sits off it.
    fn rank(&self) -> Option<u8> {
        match self {
            ConsultationStatus::Pending => Some(0),
            ConsultationStatus::Contacted => Some(1),
            ConsultationStatus::InProgress => Some(2),
            ConsultationStatus::Completed => Some(3),
            ConsultationStatus::Cancelled => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ConsultationStatus::Completed | ConsultationStatus::Cancelled
        )
    }

    pub fn can_transition_to(&self, next: ConsultationStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self.rank(), next.rank()) {
            (_, None) => true,
            (Some(from), Some(to)) => to > from,
            (None, Some(_)) => false,
        }
    }

    pub fn transition(self, next: ConsultationStatus) -> Result<ConsultationStatus, TransitionError> {
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

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConsultationPriority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConsultationSource {
    Website,
    Referral,
    Other,
}

/// A lead captured from the contact form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ConsultationRequest {
    pub id: Uuid,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    pub email: String,
    #[serde(default)]
    pub designation: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub business_field: Option<String>,
    #[serde(default)]
    pub selected_services: Vec<String>,
    #[serde(default)]
    pub other_service_description: Option<String>,
    pub status: ConsultationStatus,
    pub priority: ConsultationPriority,
    pub source: ConsultationSource,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ConsultationRequest {
    pub fn full_name(&self) -> String {
        match self.last_name.as_deref().map(str::trim) {
            Some(last) if !last.is_empty() => format!("{} {}", self.first_name, last),
            _ => self.first_name.clone(),
        }
    }
}
