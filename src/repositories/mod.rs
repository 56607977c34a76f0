//! Typed access to the record store.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::store::{Query, RecordStore, StoreError, Table};

pub mod consultations;
pub mod orders;

pub use consultations::ConsultationRepository;
pub use orders::{OrderRepository, PaymentRecord};

/// Shared plumbing: (de)serializes rows of one table.
#[derive(Clone)]
pub struct BaseRepository {
    store: Arc<dyn RecordStore>,
    table: Table,
}

impl BaseRepository {
    pub fn new(store: Arc<dyn RecordStore>, table: Table) -> Self {
        Self { store, table }
    }

    pub async fn insert<T>(&self, record: &T) -> Result<T, StoreError>
    where
        T: Serialize + DeserializeOwned,
    {
        let row = self
            .store
            .insert(self.table, serde_json::to_value(record)?)
            .await?;
        Ok(serde_json::from_value(row)?)
    }

    pub async fn select<T: DeserializeOwned>(&self, query: Query) -> Result<Vec<T>, StoreError> {
        self.store
            .select(self.table, query)
            .await?
            .into_iter()
            .map(|row| serde_json::from_value(row).map_err(StoreError::from))
            .collect()
    }

    pub async fn find<T: DeserializeOwned>(&self, id: &str) -> Result<Option<T>, StoreError> {
        Ok(self
            .select(Query::new().eq("id", id).limit(1))
            .await?
            .into_iter()
            .next())
    }

    pub async fn patch<T: DeserializeOwned>(&self, id: &str, patch: Value) -> Result<T, StoreError> {
        let row = self.store.update(self.table, id, patch).await?;
        Ok(serde_json::from_value(row)?)
    }

    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.store.delete(self.table, id).await
    }
}
