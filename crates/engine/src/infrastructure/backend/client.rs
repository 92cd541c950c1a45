//! Minimal client for the hosted row store's PostgREST API.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::infrastructure::ports::RepoError;

/// An equality filter, rendered as `column=eq.value`.
pub type EqFilter<'a> = (&'a str, String);

#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl BackendClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    fn eq_query(filters: &[EqFilter<'_>]) -> Vec<(String, String)> {
        filters
            .iter()
            .map(|(column, value)| (column.to_string(), format!("eq.{}", value)))
            .collect()
    }

    /// `GET /rest/v1/{table}?select=*&col=eq.value...`
    pub async fn select<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        table: &str,
        filters: &[EqFilter<'_>],
        order: Option<&str>,
    ) -> Result<Vec<T>, RepoError> {
        let mut query = vec![("select".to_string(), "*".to_string())];
        query.extend(Self::eq_query(filters));
        if let Some(order) = order {
            query.push(("order".to_string(), order.to_string()));
        }

        let response = self
            .authorized(self.client.get(self.table_url(table)))
            .query(&query)
            .send()
            .await?;
        let response = Self::check(operation, response).await?;
        response
            .json()
            .await
            .map_err(|e| RepoError::serialization(format!("{}: {}", operation, e)))
    }

    /// Selects at most one row.
    pub async fn select_one<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        table: &str,
        filters: &[EqFilter<'_>],
    ) -> Result<Option<T>, RepoError> {
        let rows: Vec<T> = self.select(operation, table, filters, None).await?;
        Ok(rows.into_iter().next())
    }

    /// `POST /rest/v1/{table}`
    pub async fn insert<T: Serialize + ?Sized>(
        &self,
        operation: &'static str,
        table: &str,
        row: &T,
    ) -> Result<(), RepoError> {
        let response = self
            .authorized(self.client.post(self.table_url(table)))
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .await?;
        Self::check(operation, response).await?;
        Ok(())
    }

    /// `POST` with merge-on-conflict, so the row is created or replaced.
    pub async fn upsert<T: Serialize + ?Sized>(
        &self,
        operation: &'static str,
        table: &str,
        conflict_column: &str,
        row: &T,
    ) -> Result<(), RepoError> {
        let response = self
            .authorized(self.client.post(self.table_url(table)))
            .query(&[("on_conflict", conflict_column)])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(row)
            .send()
            .await?;
        Self::check(operation, response).await?;
        Ok(())
    }

    async fn check(operation: &'static str, response: Response) -> Result<Response, RepoError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(operation, status = %status, body = %body, "Backend request failed");
        Err(RepoError::database(operation, format!("{}: {}", status, body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = BackendClient::new("https://db.example.org/", "key");
        assert_eq!(
            client.table_url("historia"),
            "https://db.example.org/rest/v1/historia"
        );
    }

    #[test]
    fn filters_render_as_eq_operators() {
        let query = BackendClient::eq_query(&[("id_historia", "4".to_string())]);
        assert_eq!(query, vec![("id_historia".to_string(), "eq.4".to_string())]);
    }
}
