// Backend module - the tabular data service queries are sent to
// The executor only talks to the `TabularBackend` trait; `PostgrestBackend`
// is the HTTP implementation used by the CLI

pub mod postgrest;

use async_trait::async_trait;
use serde::{de, Deserialize, Deserializer};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub use postgrest::PostgrestBackend;

/// The response envelope returned by the backend
///
/// A backend may report "no data", "empty body" and "explicit error" in the
/// same envelope, so both fields are optional. The executor decides what the
/// combination means.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BackendResponse {
    #[serde(default, deserialize_with = "wire_option")]
    pub data: Option<String>,
    #[serde(default, deserialize_with = "wire_option")]
    pub error: Option<String>,
}

impl BackendResponse {
    pub fn with_data(data: impl Into<String>) -> Self {
        Self {
            data: Some(data.into()),
            error: None,
        }
    }

    pub fn with_error(error: impl Into<String>) -> Self {
        Self {
            data: None,
            error: Some(error.into()),
        }
    }

    /// Decode an envelope from its JSON wire form
    /// Optional fields may be encoded as `[]` / `["x"]`, as `null` / `"x"`,
    /// or left out entirely
    pub fn from_wire(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireOption {
    List(Vec<String>),
    Plain(Option<String>),
}

fn wire_option<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match WireOption::deserialize(deserializer)? {
        WireOption::List(mut items) => match items.len() {
            0 | 1 => Ok(items.pop()),
            n => Err(de::Error::custom(format!(
                "optional value encoded with {} elements",
                n
            ))),
        },
        WireOption::Plain(value) => Ok(value),
    }
}

/// Failures below the envelope: the request never produced a response
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("request failed: {0}")]
    Failed(String),
}

/// A REST-style tabular data service
#[async_trait]
pub trait TabularBackend: Send + Sync {
    /// Read rows of `table`, constrained by `filter` when it is non-empty
    async fn read(&self, table: &str, filter: &str) -> Result<BackendResponse, TransportError>;

    /// Insert the rows in `json_body` into `table`
    async fn write(&self, table: &str, json_body: &str)
        -> Result<BackendResponse, TransportError>;
}

#[async_trait]
impl<T: TabularBackend + ?Sized> TabularBackend for Arc<T> {
    async fn read(&self, table: &str, filter: &str) -> Result<BackendResponse, TransportError> {
        (**self).read(table, filter).await
    }

    async fn write(
        &self,
        table: &str,
        json_body: &str,
    ) -> Result<BackendResponse, TransportError> {
        (**self).write(table, json_body).await
    }
}
