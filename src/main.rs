//! bq-adapter CLI Entry Point
//!
//! Drives the adapter from the command line, the way an IDE host would:
//! - `connect` - Resolve options and open a connection
//! - `query` - Execute SQL and print the result set
//! - `catalog` - Load the catalog tree
//! - `completions` - List static editor completions
//! - `options` - Describe the adapter's options
//!
//! All output to stdout is JSON-only. Logs go to stderr (`RUST_LOG` to tune).

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use bigquery_adapter::{
    completion, Adapter, AdapterConfig, AdapterError, BigQueryAdapter, ErrorEnvelope, Metadata,
    SuccessEnvelope, ADAPTER_OPTIONS,
};

/// bq-adapter - BigQuery adapter for terminal SQL IDEs
#[derive(Parser)]
#[command(name = "bq-adapter")]
#[command(about = "Query BigQuery and load its catalog with ambient credentials")]
#[command(version)]
struct Cli {
    /// The project ID to use for the BigQuery connection
    #[arg(short, long, global = true)]
    project: Option<String>,

    /// The location to use for the BigQuery connection
    #[arg(short, long, global = true)]
    location: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve options and open a connection
    Connect,

    /// Execute SQL (from --sql, --file, or stdin)
    Query {
        /// SQL text
        #[arg(long, conflicts_with = "file")]
        sql: Option<String>,

        /// File containing SQL
        #[arg(long)]
        file: Option<PathBuf>,

        /// Maximum number of rows to return
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Load the catalog (datasets, tables, routines, columns)
    Catalog {
        /// Print the host catalog items instead of the plain tree
        #[arg(long)]
        items: bool,
    },

    /// List static editor completions
    Completions,

    /// Describe the adapter's options
    Options,
}

impl Commands {
    const fn name(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Query { .. } => "query",
            Self::Catalog { .. } => "catalog",
            Self::Completions => "completions",
            Self::Options => "options",
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let adapter = BigQueryAdapter::new(AdapterConfig::new(cli.project, cli.location));

    let Some(command) = cli.command else {
        let err = AdapterError::invalid_input("No subcommand provided. Use --help to see available commands.");
        print_json(&ErrorEnvelope::from_error(BigQueryAdapter::NAME, "", &err));
        std::process::exit(1);
    };

    let start = Instant::now();
    match run(&adapter, &command).await {
        Ok((data, rows)) => {
            let elapsed = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
            let meta = match rows {
                Some(rows) => Metadata::with_rows(elapsed, rows),
                None => Metadata::new(elapsed),
            };
            print_json(&SuccessEnvelope::new(BigQueryAdapter::NAME, command.name(), data, meta));
        }
        Err(err) => {
            print_json(&ErrorEnvelope::from_error(BigQueryAdapter::NAME, command.name(), &err));
            std::process::exit(1);
        }
    }
}

/// Run one command, returning its data and the number of rows returned (if any)
async fn run(
    adapter: &BigQueryAdapter,
    command: &Commands,
) -> Result<(serde_json::Value, Option<usize>), AdapterError> {
    match command {
        Commands::Connect => {
            let conn = adapter.connect().await?;
            Ok((to_value(conn.settings())?, None))
        }
        Commands::Query { sql, file, limit } => {
            let sql = read_sql(sql.as_deref(), file.as_ref())
                .map_err(|e| AdapterError::invalid_input(format!("{e:#}")))?;
            let conn = adapter.connect().await?;

            let Some(mut stream) = conn.execute(&sql).await? else {
                return Ok((serde_json::json!({ "columns": [], "rows": [] }), Some(0)));
            };
            if let Some(limit) = limit {
                stream = stream.set_limit(*limit);
            }

            let columns = stream.columns();
            let rows = stream.fetch_all().await?;
            let count = rows.len();
            Ok((serde_json::json!({ "columns": columns, "rows": rows }), Some(count)))
        }
        Commands::Catalog { items } => {
            let conn = adapter.connect().await?;
            let tree = conn.load_catalog().await?;
            let data = if *items { to_value(&tree.to_catalog())? } else { to_value(&tree)? };
            Ok((data, None))
        }
        Commands::Completions => Ok((to_value(&completion::completions())?, None)),
        Commands::Options => Ok((to_value(&ADAPTER_OPTIONS)?, None)),
    }
}

/// SQL from `--sql`, `--file`, or stdin, in that order
fn read_sql(sql: Option<&str>, file: Option<&PathBuf>) -> anyhow::Result<String> {
    if let Some(sql) = sql {
        return Ok(sql.to_string());
    }
    if let Some(path) = file {
        return std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read SQL file {}", path.display()));
    }

    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf).context("Failed to read SQL from stdin")?;
    anyhow::ensure!(!buf.trim().is_empty(), "No SQL provided (use --sql, --file, or stdin)");
    Ok(buf)
}

fn to_value<T: serde::Serialize + ?Sized>(value: &T) -> Result<serde_json::Value, AdapterError> {
    serde_json::to_value(value).map_err(|e| AdapterError::invalid_input(format!("Failed to serialize output: {e}")))
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("failed to serialize output: {e}"),
    }
}
