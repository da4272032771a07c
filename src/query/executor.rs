// Query Executor
// This module sends compiled queries to the backend and normalizes whatever
// comes back into a list of records

use super::parser::ParsedQuery;
use crate::backend::{BackendResponse, TabularBackend, TransportError};
use crate::record::{Record, Value};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Failures while running a query against the backend
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecError {
    /// The backend reported an error, or the request could not be sent
    #[error("backend error: {0}")]
    Backend(String),

    #[error("backend did not answer within {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("request body is not valid JSON: {0}")]
    InvalidBody(String),
}

impl From<TransportError> for ExecError {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::Timeout(after) => ExecError::Timeout(after),
            TransportError::Failed(message) => ExecError::Backend(message),
        }
    }
}

/// Runs ParsedQuery values against a backend
/// One backend call per invocation; no retries, no caching
pub struct QueryExecutor<B> {
    backend: B,
    /// Upper bound on a single backend call, whatever the backend does
    timeout: Duration,
}

impl<B: TabularBackend> QueryExecutor<B> {
    pub fn new(backend: B, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Read the rows selected by a compiled query
    /// An empty filter reads the whole table
    pub async fn execute(&self, parsed: &ParsedQuery) -> Result<Vec<Record>, ExecError> {
        debug!(table = %parsed.table, filter = %parsed.filter, "reading from backend");

        let response = self
            .bounded(self.backend.read(&parsed.table, &parsed.filter))
            .await?;
        let records = normalize(response)?;

        debug!(rows = records.len(), "read complete");
        Ok(records)
    }

    /// Insert JSON rows into `table`, returning the rows the backend echoes back
    pub async fn insert(&self, table: &str, json_body: &str) -> Result<Vec<Record>, ExecError> {
        serde_json::from_str::<serde_json::Value>(json_body)
            .map_err(|e| ExecError::InvalidBody(e.to_string()))?;

        debug!(table, bytes = json_body.len(), "writing to backend");

        let response = self.bounded(self.backend.write(table, json_body)).await?;
        normalize(response)
    }

    async fn bounded<F>(&self, call: F) -> Result<BackendResponse, ExecError>
    where
        F: Future<Output = Result<BackendResponse, TransportError>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(|e| {
                warn!(error = %e, "backend call failed");
                ExecError::from(e)
            }),
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "backend call timed out");
                Err(ExecError::Timeout(self.timeout))
            }
        }
    }
}

/// Turn a backend envelope into records
///
/// - a non-empty error wins, even when data is also present
/// - a payload that is not JSON becomes a single `{value: <raw>}` record
/// - a single JSON object becomes a one-element list
/// - no payload (or an empty one) is an empty list
pub fn normalize(response: BackendResponse) -> Result<Vec<Record>, ExecError> {
    if let Some(error) = response.error.filter(|e| !e.trim().is_empty()) {
        warn!(%error, "backend reported an error");
        return Err(ExecError::Backend(error));
    }

    let Some(payload) = response.data.filter(|d| !d.trim().is_empty()) else {
        return Ok(Vec::new());
    };

    match serde_json::from_str::<serde_json::Value>(&payload) {
        Ok(json) => Ok(records_from_json(json)),
        Err(e) => {
            warn!(error = %e, "backend payload is not JSON, keeping it as raw text");
            Ok(vec![Record::single(Value::Text(payload))])
        }
    }
}

fn records_from_json(json: serde_json::Value) -> Vec<Record> {
    match json {
        serde_json::Value::Array(items) => items.into_iter().map(record_from_item).collect(),
        serde_json::Value::Null => Vec::new(),
        other => vec![record_from_item(other)],
    }
}

fn record_from_item(item: serde_json::Value) -> Record {
    match item {
        serde_json::Value::Object(fields) => Record::from_json_object(fields),
        scalar => Record::single(Value::from_json(scalar)),
    }
}
