//! HTTP client for the REST data API
//!
//! Both auth headers carry the same service key. Any non-2xx answer becomes
//! [`IngestError::Rest`].

use super::endpoints::{self, API_KEY_HEADER};
use super::Row;
use crate::config::RestCredentials;
use crate::error::{IngestError, Result};
use crate::tables::PERIOD_COLUMN;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_RANGE, RANGE};
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::debug;

pub struct RestClient {
    client: Client,
    base_url: String,
}

impl RestClient {
    pub fn new(credentials: &RestCredentials, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, header_value(&credentials.service_key)?);
        headers.insert(
            AUTHORIZATION,
            header_value(&format!("Bearer {}", credentials.service_key))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: credentials.base_url.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST one batch of rows, asking for a minimal response
    pub async fn insert_batch(&self, table: &str, rows: &[Row]) -> Result<()> {
        let url = endpoints::table_url(&self.base_url, table);
        debug!(table = %table, rows = rows.len(), "POST batch");

        let response = self
            .client
            .post(&url)
            .query(&[("return", "minimal")])
            .header("Prefer", "return=minimal")
            .json(rows)
            .send()
            .await?;

        ensure_success("POST", table, response).await.map(|_| ())
    }

    /// DELETE every row of `table` whose period column equals `period`
    pub async fn delete_period(&self, table: &str, period: &str) -> Result<()> {
        let url = endpoints::table_url(&self.base_url, table);
        debug!(table = %table, period = %period, "DELETE period");

        let response = self
            .client
            .delete(&url)
            .query(&[(PERIOD_COLUMN, endpoints::eq_filter(period))])
            .send()
            .await?;

        ensure_success("DELETE", table, response).await.map(|_| ())
    }

    /// Exact row count without downloading rows
    pub async fn count_rows(&self, table: &str) -> Result<Option<u64>> {
        let url = endpoints::table_url(&self.base_url, table);

        let response = self
            .client
            .get(&url)
            .query(&[("select", "*")])
            .header(RANGE, "0-0")
            .header("Range-Unit", "items")
            .header("Prefer", "count=exact")
            .send()
            .await?;

        let response = ensure_success("GET", table, response).await?;
        Ok(response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(endpoints::parse_content_range_total))
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| IngestError::config("SUPABASE_SERVICE_KEY contains invalid header characters"))
}

async fn ensure_success(method: &'static str, table: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(IngestError::Rest {
        method,
        table: table.to_string(),
        status: status.as_u16(),
        body,
    })
}
