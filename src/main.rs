// Main entry point for the nlquery CLI
// This provides an interactive shell that answers plain-English questions
// from a PostgREST-compatible backend

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use nlquery::config::{DEFAULT_BACKEND_URL, DEFAULT_TIMEOUT_MS};
use nlquery::record::format_records;
use nlquery::{
    Config, PostgrestBackend, QueryExecutor, QueryParser, QueryService, Record, Vocabulary,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

/// nlquery - ask a PostgREST backend questions in plain English
#[derive(ClapParser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Answer a single question and exit
    #[arg(short, long)]
    execute: Option<String>,

    /// Only show the compiled query; never contact the backend
    #[arg(short, long)]
    parse_only: bool,

    /// Print results as JSON instead of a table
    #[arg(long)]
    json: bool,

    /// Insert JSON rows into a table and exit
    #[arg(long, num_args = 2, value_names = ["TABLE", "JSON"], conflicts_with_all = ["execute", "parse_only"])]
    insert: Option<Vec<String>>,

    /// Root URL of the PostgREST-compatible backend
    #[arg(long, env = "NLQUERY_BACKEND_URL", default_value = DEFAULT_BACKEND_URL)]
    backend_url: String,

    /// API key sent with every request
    #[arg(long, env = "NLQUERY_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Give up on a backend call after this many milliseconds
    #[arg(long, env = "NLQUERY_TIMEOUT_MS", default_value_t = DEFAULT_TIMEOUT_MS)]
    timeout_ms: u64,

    /// JSON vocabulary file (defaults to the builtin todos/users/posts vocabulary)
    #[arg(long, env = "NLQUERY_VOCABULARY")]
    vocabulary: Option<PathBuf>,
}

impl Args {
    fn config(&self) -> Config {
        Config {
            backend_url: self.backend_url.clone(),
            api_key: self.api_key.clone(),
            timeout_ms: self.timeout_ms,
            vocabulary_path: self.vocabulary.clone(),
        }
    }
}

/// What the shell does with each question
enum Session {
    /// Compile only
    ParseOnly(QueryParser),
    /// Compile and run against the backend
    Live(QueryService<PostgrestBackend>),
}

impl Session {
    async fn handle(&self, question: &str, json: bool) -> Result<()> {
        match self {
            Session::ParseOnly(parser) => {
                let parsed = parser.parse(question)?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&parsed)?);
                } else {
                    println!("table:  {}", parsed.table);
                    if parsed.has_filter() {
                        println!("filter: {}", parsed.filter);
                    } else {
                        println!("filter: (none, all rows)");
                    }
                }
            }
            Session::Live(service) => {
                let records = service.answer(question).await?;
                print_records(&records, json)?;
            }
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let config = args.config();

    let vocabulary = match &config.vocabulary_path {
        Some(path) => Vocabulary::load(path)
            .with_context(|| format!("Failed to load vocabulary from {}", path.display()))?,
        None => Vocabulary::builtin(),
    };
    let parser = QueryParser::new(Arc::new(vocabulary));

    let session = if args.parse_only {
        Session::ParseOnly(parser)
    } else {
        let backend =
            PostgrestBackend::from_config(&config).context("Invalid backend configuration")?;
        let executor = QueryExecutor::new(backend, config.timeout());
        Session::Live(QueryService::new(parser, executor))
    };

    if let Some(insert) = &args.insert {
        let Session::Live(service) = &session else {
            anyhow::bail!("--insert cannot be combined with --parse-only");
        };
        let (table, body) = (&insert[0], &insert[1]);
        let records = service.insert(table, body).await?;
        print_records(&records, args.json)?;
        return Ok(());
    }

    // If a question was provided, answer it and exit
    if let Some(question) = &args.execute {
        return session.handle(question, args.json).await;
    }

    // Interactive REPL (Read-Eval-Print Loop)
    println!("╔════════════════════════════════════════════╗");
    println!("║          nlquery Interactive Shell         ║");
    println!("║    Ask your database in plain English      ║");
    println!("╚════════════════════════════════════════════╝");
    println!();
    if args.parse_only {
        println!("Parse-only mode: queries are compiled, not executed");
    } else if let Session::Live(service) = &session {
        println!(
            "Backend: {} (timeout {}ms)",
            config.backend_url,
            service.executor().timeout().as_millis()
        );
    }
    println!("Type a question or '.help' for help");
    println!("Type '.exit' to quit");
    println!();

    repl(&session, args.json).await
}

async fn repl(session: &Session, json: bool) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = io::stdout();

    loop {
        // Print prompt
        print!("nlquery> ");
        stdout.flush()?; // Ensure prompt is displayed immediately

        // End of input (Ctrl-D)
        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        // Handle special commands (starting with .)
        if input.starts_with('.') {
            match input {
                ".exit" | ".quit" => {
                    println!("Goodbye!");
                    break;
                }
                ".help" => {
                    print_help();
                    continue;
                }
                _ => {
                    println!("Unknown command: {}", input);
                    println!("Type '.help' for help");
                    continue;
                }
            }
        }

        if let Err(e) = session.handle(input, json).await {
            eprintln!("Error: {}", e);
        }
    }

    Ok(())
}

fn print_records(records: &[Record], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(records)?);
    } else {
        println!("{}", format_records(records));
    }
    Ok(())
}

/// Print help information
fn print_help() {
    println!("╔════════════════════════════════════════════╗");
    println!("║               nlquery Help                 ║");
    println!("╚════════════════════════════════════════════╝");
    println!();
    println!("Special Commands:");
    println!("  .help              Show this help message");
    println!("  .exit, .quit       Exit the shell");
    println!();
    println!("Example questions:");
    println!();
    println!("  All rows:");
    println!("    get all todos");
    println!("    list all users");
    println!();
    println!("  Completion state:");
    println!("    show completed todos");
    println!("    show me unfinished tasks");
    println!("    todos that are not done");
    println!();
    println!("  By id:");
    println!("    find todos with id 1");
    println!("    posts with id above 10");
    println!();
    println!("Notes:");
    println!("  - Questions are case-insensitive");
    println!("  - The first table mentioned wins: 'users with todos' reads users");
    println!("  - An id filter takes precedence over done/not done");
    println!();
}
