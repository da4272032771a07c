// PostgREST HTTP backend
// Reads are `GET {base}/rest/v1/{table}?select=*&{filter}`, writes are
// `POST {base}/rest/v1/{table}` with a JSON body. Non-2xx answers come back
// as an envelope error, transport failures as `TransportError`

use super::{BackendResponse, TabularBackend, TransportError};
use crate::config::{Config, ConfigError};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use std::time::Duration;
use tracing::debug;
use url::Url;

const SELECT_ALL: &str = "select=*";

pub struct PostgrestBackend {
    http: Client,
    base_url: Url,
    api_key: Option<String>,
    timeout: Duration,
}

impl PostgrestBackend {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;
        Self::new(config.backend_url()?, config.api_key.clone(), config.timeout())
    }

    pub fn new(
        base_url: Url,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidUrl {
                url: base_url.to_string(),
                reason: "URL cannot carry a path".to_string(),
            });
        }

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            api_key,
            timeout,
        })
    }

    /// `{base}/rest/v1/{table}`, with the table name percent-encoded
    pub fn table_url(&self, table: &str) -> Url {
        let mut url = self.base_url.clone();
        // Cannot fail: cannot-be-a-base URLs are rejected in `new`
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["rest", "v1", table]);
        }
        url
    }

    /// The full read URL; the filter is appended verbatim after `select=*`
    pub fn read_url(&self, table: &str, filter: &str) -> Url {
        let mut url = self.table_url(table);
        if filter.is_empty() {
            url.set_query(Some(SELECT_ALL));
        } else {
            url.set_query(Some(&format!("{}&{}", SELECT_ALL, filter)));
        }
        url
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header("Accept", "application/json");
        match &self.api_key {
            Some(key) => request
                .header("apikey", key)
                .header("Authorization", format!("Bearer {}", key)),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<BackendResponse, TransportError> {
        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;

        debug!(status = status.as_u16(), bytes = body.len(), "backend answered");

        if status.is_success() {
            Ok(BackendResponse::with_data(body))
        } else {
            Ok(BackendResponse::with_error(format!(
                "HTTP {} - {}",
                status.as_u16(),
                body
            )))
        }
    }

    fn transport_error(&self, error: reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else {
            TransportError::Failed(error.to_string())
        }
    }
}

#[async_trait]
impl TabularBackend for PostgrestBackend {
    async fn read(&self, table: &str, filter: &str) -> Result<BackendResponse, TransportError> {
        let url = self.read_url(table, filter);
        debug!(%url, "GET");
        self.send(self.authorized(self.http.get(url))).await
    }

    async fn write(
        &self,
        table: &str,
        json_body: &str,
    ) -> Result<BackendResponse, TransportError> {
        let url = self.table_url(table);
        debug!(%url, "POST");
        let request = self
            .authorized(self.http.post(url))
            .header("Content-Type", "application/json")
            .header("Prefer", "return=representation")
            .body(json_body.to_string());
        self.send(request).await
    }
}
