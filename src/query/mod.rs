// Query module - handles natural-language parsing and execution
pub mod executor;
pub mod parser;
pub mod service;

pub use executor::{ExecError, QueryExecutor};
pub use parser::{Operator, ParseError, ParsedQuery, Predicate, QueryParser};
pub use service::{QueryError, QueryService};
