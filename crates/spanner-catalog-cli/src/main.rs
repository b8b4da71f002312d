//! spanner-catalog CLI - Inspect Cloud Spanner schemas and rows.

use clap::{Parser, Subcommand};
use serde_json::json;
use spanner_catalog::{CatalogError, Config, Connection, Context, DriverCatalog, Schema};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser)]
#[command(name = "spanner-catalog")]
#[command(about = "Schema introspection and type mapping for Cloud Spanner")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "warn")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every table with its primary key
    Tables,

    /// Show the columns and primary key of one table
    Describe {
        /// Table name (exact, case-sensitive)
        table: String,
    },

    /// Read all rows of one table
    Rows {
        /// Table name (exact, case-sensitive)
        table: String,
    },

    /// Test the database connection
    HealthCheck,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), CatalogError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    let config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    let ctx = Context::with_cancel(setup_signal_handler());
    let catalog = DriverCatalog::with_builtins();

    let started = Instant::now();
    let conn = catalog.open(&config.driver, &ctx, &config.connection).await?;

    let result = execute(&cli, conn.as_ref(), &ctx, started).await;
    conn.close().await?;
    result
}

async fn execute(
    cli: &Cli,
    conn: &dyn Connection,
    ctx: &Context,
    started: Instant,
) -> Result<(), CatalogError> {
    match &cli.command {
        Commands::Tables => {
            let mut schemas: Vec<Schema> = conn.discover_all(ctx).await?.into_values().collect();
            schemas.sort_by(|a, b| a.name.cmp(&b.name));

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&schemas)?);
            } else {
                for schema in &schemas {
                    let pk = schema
                        .primary_key
                        .as_ref()
                        .map(|k| k.column_names.join(", "))
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "{:<32} {:>3} columns  key: {}",
                        schema.name,
                        schema.columns.len(),
                        pk
                    );
                }
            }
        }

        Commands::Describe { table } => {
            let schema = conn.get_schema(ctx, table).await?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&schema)?);
            } else {
                print_schema(&schema);
            }
        }

        Commands::Rows { table } => {
            let rows = conn.get_rows(ctx, table).await?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                for row in &rows {
                    println!("{}", serde_json::to_string(&row.values)?);
                }
                println!("\n{} rows", rows.len());
            }
        }

        Commands::HealthCheck => {
            let tables = conn.discover_all(ctx).await?.len();
            let latency_ms = started.elapsed().as_millis() as u64;

            if cli.output_json {
                let result = json!({
                    "healthy": true,
                    "tables": tables,
                    "latency_ms": latency_ms,
                });
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Health Check Results:");
                println!("  Spanner: OK ({}ms)", latency_ms);
                println!("  Tables: {}", tables);
            }
        }
    }

    Ok(())
}

fn print_schema(schema: &Schema) {
    println!("Table: {}", schema.name);
    for column in &schema.columns {
        println!(
            "  {:>3}  {:<32} {:<12} {}",
            column.ordinal_position,
            column.name,
            column.column_type,
            if column.not_null { "NOT NULL" } else { "NULL" }
        );
    }
    match &schema.primary_key {
        Some(key) => println!("  Key: {}", key),
        None => println!("  Key: none"),
    }
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    // Logs go to stderr so --output-json stays parseable.
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Cancel in-flight queries on SIGINT or SIGTERM.
#[cfg(unix)]
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();

    for (kind, name) in [
        (SignalKind::interrupt(), "SIGINT"),
        (SignalKind::terminate(), "SIGTERM"),
    ] {
        let token = cancel_token.clone();
        match signal(kind) {
            Ok(mut stream) => {
                tokio::spawn(async move {
                    stream.recv().await;
                    eprintln!("\nReceived {}. Cancelling...", name);
                    token.cancel();
                });
            }
            Err(e) => eprintln!("Failed to install {} handler: {}", name, e),
        }
    }

    cancel_token
}

/// Cancel in-flight queries on Ctrl-C.
#[cfg(not(unix))]
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nReceived Ctrl-C. Cancelling...");
            token.cancel();
        }
    });

    cancel_token
}
