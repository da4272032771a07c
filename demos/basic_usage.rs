// Example: compile questions and answer them from an in-memory backend
// Run with: cargo run --example basic_usage

use async_trait::async_trait;
use nlquery::backend::TransportError;
use nlquery::record::format_records;
use nlquery::{BackendResponse, QueryExecutor, QueryParser, QueryService, TabularBackend};
use serde_json::{json, Value};
use std::time::Duration;

/// Serves a fixed todos table and understands `column=eq.value` filters
struct InMemoryTodos {
    rows: Vec<Value>,
}

impl InMemoryTodos {
    fn new() -> Self {
        let titles = [
            ("Buy groceries", false),
            ("Walk the dog", true),
            ("Finish project", false),
            ("Read book", true),
            ("Learn Rust", true),
        ];
        let rows = titles
            .iter()
            .enumerate()
            .map(|(i, (title, done))| json!({"id": i + 1, "title": title, "is_done": done}))
            .collect();
        Self { rows }
    }

    fn matches(row: &Value, filter: &str) -> bool {
        let Some((column, rest)) = filter.split_once('=') else {
            return true;
        };
        let Some(("eq", value)) = rest.split_once('.') else {
            return false;
        };
        row.get(column).map(|v| v.to_string() == value).unwrap_or(false)
    }
}

#[async_trait]
impl TabularBackend for InMemoryTodos {
    async fn read(&self, table: &str, filter: &str) -> Result<BackendResponse, TransportError> {
        if table != "todos" {
            return Ok(BackendResponse::with_error(format!("HTTP 404 - unknown table {}", table)));
        }
        let rows: Vec<&Value> = self.rows.iter().filter(|r| Self::matches(r, filter)).collect();
        Ok(BackendResponse::with_data(json!(rows).to_string()))
    }

    async fn write(&self, _table: &str, json_body: &str) -> Result<BackendResponse, TransportError> {
        Ok(BackendResponse::with_data(json_body))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("=== nlquery Basic Usage Example ===\n");

    let parser = QueryParser::default();

    // 1. Compile some questions
    println!("1. Compiling questions...");
    for question in [
        "get all todos",
        "show completed todos",
        "show me unfinished tasks",
        "find todos with id 1",
        "list all users",
    ] {
        let parsed = parser.parse(question)?;
        println!("  {:<28} -> table={} filter='{}'", question, parsed.table, parsed.filter);
    }
    println!();

    // 2. Questions that cannot be compiled
    println!("2. Rejected questions...");
    for question in ["", "asdfqwer", "completed and incomplete todos"] {
        match parser.parse(question) {
            Ok(parsed) => println!("  unexpected: {:?}", parsed),
            Err(e) => println!("  {:<32} -> {}", format!("'{}'", question), e),
        }
    }
    println!();

    // 3. Answer questions end to end
    let service = QueryService::new(
        parser,
        QueryExecutor::new(InMemoryTodos::new(), Duration::from_secs(1)),
    );

    println!("3. Completed todos...");
    let records = service.answer("show completed todos").await?;
    println!("{}\n", format_records(&records));

    println!("4. Todo with id 3...");
    let records = service.answer("find todos with id 3").await?;
    println!("{}\n", format_records(&records));

    println!("5. A table the backend does not have...");
    match service.answer("list all users").await {
        Ok(records) => println!("{}", format_records(&records)),
        Err(e) => println!("Error: {}", e),
    }
    println!();

    println!("=== Example Complete ===");
    Ok(())
}
