use async_trait::async_trait;
use serde_json::Value;
use std::{cmp::Ordering, collections::HashMap};
use tokio::sync::RwLock;

use super::{Query, RecordStore, SortDirection, StoreError, Table};

/// Process-local record store used for development without a configured
/// backend and as the default collaborator in tests.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<Table, Vec<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently held in `table`.
    pub async fn len(&self, table: Table) -> usize {
        self.tables
            .read()
            .await
            .get(&table)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

fn field_as_text(record: &Value, field: &str) -> Option<String> {
    match record.get(field)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

fn record_id(record: &Value) -> Option<String> {
    field_as_text(record, "id")
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert(&self, table: Table, record: Value) -> Result<Value, StoreError> {
        if !record.is_object() {
            return Err(StoreError::Decode("records must be JSON objects".into()));
        }
        let id = record_id(&record)
            .ok_or_else(|| StoreError::Decode("records must carry an id".into()))?;

        let mut tables = self.tables.write().await;
        let rows = tables.entry(table).or_default();
        if rows.iter().any(|row| record_id(row).as_deref() == Some(id.as_str())) {
            return Err(StoreError::Api {
                status: 409,
                body: format!("duplicate key {}", id),
            });
        }
        rows.push(record.clone());
        Ok(record)
    }

    async fn select(&self, table: Table, query: Query) -> Result<Vec<Value>, StoreError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Value> = tables
            .get(&table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| {
                        query.filters.iter().all(|(field, expected)| {
                            field_as_text(row, field).as_deref() == Some(expected.as_str())
                        })
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some((field, direction)) = &query.order {
            rows.sort_by(|a, b| {
                let ordering = compare_values(a.get(field), b.get(field));
                match direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn update(&self, table: Table, id: &str, patch: Value) -> Result<Value, StoreError> {
        let Value::Object(patch) = patch else {
            return Err(StoreError::Decode("patch must be a JSON object".into()));
        };

        let mut tables = self.tables.write().await;
        let row = tables
            .get_mut(&table)
            .and_then(|rows| rows.iter_mut().find(|row| record_id(row).as_deref() == Some(id)))
            .ok_or_else(|| StoreError::NotFound(format!("{}/{}", table, id)))?;

        if let Value::Object(fields) = row {
            for (key, value) in patch {
                fields.insert(key, value);
            }
        }
        Ok(row.clone())
    }

    async fn delete(&self, table: Table, id: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let rows = tables
            .get_mut(&table)
            .ok_or_else(|| StoreError::NotFound(format!("{}/{}", table, id)))?;
        let before = rows.len();
        rows.retain(|row| record_id(row).as_deref() != Some(id));
        if rows.len() == before {
            return Err(StoreError::NotFound(format!("{}/{}", table, id)));
        }
        Ok(())
    }
}
