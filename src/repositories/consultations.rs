use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use super::BaseRepository;
use crate::{
    models::{ConsultationRequest, ConsultationStatus},
    store::{Query, RecordStore, StoreError, Table},
};

/// Repository for consultation leads
#[derive(Clone)]
pub struct ConsultationRepository {
    base: BaseRepository,
}

impl ConsultationRepository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            base: BaseRepository::new(store, Table::ConsultationRequests),
        }
    }

    pub async fn create(&self, request: &ConsultationRequest) -> Result<ConsultationRequest, StoreError> {
        self.base.insert(request).await
    }

    /// All requests, newest first
    pub async fn list_recent(&self) -> Result<Vec<ConsultationRequest>, StoreError> {
        self.base.select(Query::newest_first()).await
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<ConsultationRequest>, StoreError> {
        self.base.find(&id.to_string()).await
    }

    /// Writes the new status and, when given, replaces the notes.
    pub async fn set_status(
        &self,
        id: Uuid,
        status: ConsultationStatus,
        notes: Option<String>,
    ) -> Result<ConsultationRequest, StoreError> {
        let mut patch = json!({ "status": status, "updated_at": Utc::now() });
        if let (Some(notes), Value::Object(fields)) = (notes, &mut patch) {
            fields.insert("notes".into(), Value::String(notes));
        }
        self.base.patch(&id.to_string(), patch).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        self.base.delete(&id.to_string()).await
    }
}
