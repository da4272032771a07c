// Query service - the parser and executor wired together
// This is what the CLI (or any other caller) talks to

use super::executor::{ExecError, QueryExecutor};
use super::parser::{ParseError, ParsedQuery, QueryParser};
use crate::backend::TabularBackend;
use crate::record::Record;
use thiserror::Error;
use tracing::info;

/// Anything that can go wrong between a question and its records
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error("'{0}' is not a known table")]
    UnknownTable(String),
}

pub struct QueryService<B> {
    parser: QueryParser,
    executor: QueryExecutor<B>,
}

impl<B: TabularBackend> QueryService<B> {
    pub fn new(parser: QueryParser, executor: QueryExecutor<B>) -> Self {
        Self { parser, executor }
    }

    pub fn executor(&self) -> &QueryExecutor<B> {
        &self.executor
    }

    /// Compile a question without touching the backend
    pub fn parse(&self, text: &str) -> Result<ParsedQuery, ParseError> {
        self.parser.parse(text)
    }

    /// Compile a question and run it
    pub async fn answer(&self, text: &str) -> Result<Vec<Record>, QueryError> {
        let parsed = self.parser.parse(text)?;
        info!(table = %parsed.table, filter = %parsed.filter, "answering question");
        Ok(self.executor.execute(&parsed).await?)
    }

    /// Insert JSON rows into one of the vocabulary's tables
    pub async fn insert(&self, table: &str, json_body: &str) -> Result<Vec<Record>, QueryError> {
        if !self.parser.vocabulary().is_table(table) {
            return Err(QueryError::UnknownTable(table.to_string()));
        }
        Ok(self.executor.insert(table, json_body).await?)
    }
}
