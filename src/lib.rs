// nlquery - compiles plain-English questions into PostgREST queries
// This is the library root that exposes the public API

pub mod backend;
pub mod config;
pub mod query;
pub mod record;
pub mod vocab;

// Re-export commonly used types for convenience
pub use backend::{BackendResponse, PostgrestBackend, TabularBackend};
pub use config::Config;
pub use query::{
    ExecError, ParseError, ParsedQuery, QueryError, QueryExecutor, QueryParser, QueryService,
};
pub use record::{Record, Value};
pub use vocab::Vocabulary;
