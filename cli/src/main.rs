//! Entry point: open the database from a schema file and run the shell.

mod base;
mod config;
mod shell;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use cmdforge_core::Value;
use cmdforge_sqlite::Database;
use tracing_subscriber::EnvFilter;

use crate::config::load_config;
use crate::shell::{Shell, build_registry, repl, run_line};

#[derive(Debug, Parser)]
#[command(name = "cmdforge", version)]
#[command(about = "Interactive CRUD shell generated from a table schema")]
struct Cli {
    /// Schema file describing the tables (JSON or YAML).
    schema: PathBuf,

    /// Database file; an in-memory database is used when omitted.
    #[arg(short = 'd', long)]
    database: Option<PathBuf>,

    /// Optional shell config file (JSON, YAML, or key = value lines).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run a single command line and exit instead of starting the loop.
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Include failing statements and data in storage error output.
    #[arg(long)]
    debug: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli
        .config
        .as_deref()
        .map(load_config)
        .unwrap_or_default();

    let debug = cli.debug
        || config
            .get("DEBUG")
            .is_some_and(Value::is_truthy);
    let database_path = cli.database.clone().or_else(|| match config.get("DATABASE") {
        Some(Value::Str(path)) => Some(PathBuf::from(path)),
        _ => None,
    });
    let prompt = match config.get("PROMPT") {
        Some(Value::Str(prompt)) => prompt.clone(),
        _ => ">".to_string(),
    };

    let database = match Database::from_schema_file(database_path.as_deref(), &cli.schema) {
        Ok(database) => database,
        Err(error) => {
            eprintln!("error: {error}");
            return ExitCode::FAILURE;
        }
    };
    if !database.prepare() {
        for entry in database.errors() {
            eprintln!("error: table [{}]: {}", entry.table, entry.message);
        }
        return ExitCode::FAILURE;
    }

    let mut shell = Shell::new(database, debug);
    let registry = match build_registry(&shell.database) {
        Ok(registry) => registry,
        Err(error) => {
            eprintln!("error: {error}");
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Some(line) => {
            run_line(&registry, &mut shell, &line);
        }
        None => {
            if let Err(error) = repl(&registry, &mut shell, &prompt) {
                eprintln!("error: {error}");
                return ExitCode::FAILURE;
            }
        }
    }
    ExitCode::SUCCESS
}
