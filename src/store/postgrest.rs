use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

use super::{Query, RecordStore, StoreError, Table};

/// Record store backed by a hosted PostgREST endpoint (`<base>/rest/v1/<table>`).
#[derive(Clone)]
pub struct PostgrestStore {
    http: Client,
    base_url: String,
    api_key: String,
}

impl PostgrestStore {
    /// `api_key` should be the service-role key: the server writes on behalf of
    /// anonymous visitors and reads admin-only tables.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn table_url(&self, table: Table) -> String {
        format!("{}/rest/v1/{}", self.base_url, table.as_str())
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header(header::ACCEPT, "application/json")
    }

    async fn rows(response: Response) -> Result<Vec<Value>, StoreError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(StoreError::Api {
                status: status.as_u16(),
                body,
            });
        }
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&body)?)
    }
}

fn query_pairs(query: &Query) -> Vec<(String, String)> {
    let mut pairs = vec![("select".to_string(), "*".to_string())];
    pairs.extend(
        query
            .filters
            .iter()
            .map(|(field, value)| (field.clone(), format!("eq.{}", value))),
    );
    if let Some((field, direction)) = &query.order {
        pairs.push(("order".into(), format!("{}.{}", field, direction.as_str())));
    }
    if let Some(limit) = query.limit {
        pairs.push(("limit".into(), limit.to_string()));
    }
    pairs
}

#[async_trait]
impl RecordStore for PostgrestStore {
    #[instrument(skip(self, record), fields(table = %table))]
    async fn insert(&self, table: Table, record: Value) -> Result<Value, StoreError> {
        let response = self
            .authorized(self.http.post(self.table_url(table)))
            .header("Prefer", "return=representation")
            .json(&record)
            .send()
            .await?;
        Self::rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Decode(format!("insert into {} returned no rows", table)))
    }

    #[instrument(skip(self, query), fields(table = %table))]
    async fn select(&self, table: Table, query: Query) -> Result<Vec<Value>, StoreError> {
        let response = self
            .authorized(self.http.get(self.table_url(table)))
            .query(&query_pairs(&query))
            .send()
            .await?;
        let rows = Self::rows(response).await?;
        debug!(count = rows.len(), "selected rows");
        Ok(rows)
    }

    #[instrument(skip(self, patch), fields(table = %table, id = %id))]
    async fn update(&self, table: Table, id: &str, patch: Value) -> Result<Value, StoreError> {
        let response = self
            .authorized(self.http.patch(self.table_url(table)))
            .header("Prefer", "return=representation")
            .query(&[("id", format!("eq.{}", id))])
            .json(&patch)
            .send()
            .await?;
        Self::rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound(format!("{}/{}", table, id)))
    }

    #[instrument(skip(self), fields(table = %table, id = %id))]
    async fn delete(&self, table: Table, id: &str) -> Result<(), StoreError> {
        let response = self
            .authorized(self.http.delete(self.table_url(table)))
            .header("Prefer", "return=representation")
            .query(&[("id", format!("eq.{}", id))])
            .send()
            .await?;
        if Self::rows(response).await?.is_empty() {
            return Err(StoreError::NotFound(format!("{}/{}", table, id)));
        }
        Ok(())
    }
}
