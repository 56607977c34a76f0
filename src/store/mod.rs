//! Record-store collaborator.
//!
//! Persistence is delegated to an external row store that speaks JSON
//! records. The contract is deliberately narrow: insert, select with
//! equality filters and one ordering, patch by id, and delete by id.
//! Typed access lives in [`crate::repositories`].

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

pub mod memory;
pub mod postgrest;

pub use memory::MemoryStore;
pub use postgrest::PostgrestStore;

/// Tables this application reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    ConsultationRequests,
    Orders,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::ConsultationRequests => "consultation_requests",
            Table::Orders => "orders",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        }
    }
}

/// Select query: conjunctive equality filters, optional ordering and limit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<(String, String)>,
    pub order: Option<(String, SortDirection)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.order = Some((field.into(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Shorthand for the newest-first listing every admin view uses.
    pub fn newest_first() -> Self {
        Self::new().order_by("created_at", SortDirection::Descending)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("record store rejected request (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("record could not be decoded: {0}")]
    Decode(String),

    #[error("record store unavailable: {0}")]
    Unavailable(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Decode(err.to_string())
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Inserts a record and returns the stored representation.
    async fn insert(&self, table: Table, record: Value) -> Result<Value, StoreError>;

    async fn select(&self, table: Table, query: Query) -> Result<Vec<Value>, StoreError>;

    /// Merges `patch` into the record with the given id and returns the result.
    async fn update(&self, table: Table, id: &str, patch: Value) -> Result<Value, StoreError>;

    async fn delete(&self, table: Table, id: &str) -> Result<(), StoreError>;
}
