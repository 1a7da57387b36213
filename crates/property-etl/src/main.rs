//! CLI entry point for the property ETL pipeline.

use anyhow::{Result, anyhow};
use clap::{Parser, ValueEnum};
use dotenv::dotenv;
use property_etl::{
    EtlConfig, EtlPipeline, FailurePolicy, RoundingMode, RunReport, TableStatus,
    UnresolvedKeyPolicy,
};
use rusqlite::Connection;
use std::env;
use std::path::PathBuf;
use tracing::{debug, info};

/// Environment variable holding the database path when `--database` is absent.
const DATABASE_ENV_VAR: &str = "PROPERTY_ETL_DATABASE";

/// CLI-compatible rounding mode enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliRoundingMode {
    /// Ties go to the even neighbour
    HalfToEven,
    /// Ties go away from zero
    HalfAwayFromZero,
}

impl From<CliRoundingMode> for RoundingMode {
    fn from(cli: CliRoundingMode) -> Self {
        match cli {
            CliRoundingMode::HalfToEven => RoundingMode::HalfToEven,
            CliRoundingMode::HalfAwayFromZero => RoundingMode::HalfAwayFromZero,
        }
    }
}

/// CLI-compatible failure policy enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliFailurePolicy {
    /// Skip every table after the first failure
    Halt,
    /// Keep loading later tables
    Continue,
}

impl From<CliFailurePolicy> for FailurePolicy {
    fn from(cli: CliFailurePolicy) -> Self {
        match cli {
            CliFailurePolicy::Halt => FailurePolicy::Halt,
            CliFailurePolicy::Continue => FailurePolicy::Continue,
        }
    }
}

/// CLI-compatible unresolved key policy enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliUnresolvedKeys {
    /// Leave the row out
    Skip,
    /// Insert the row with a NULL foreign key
    Null,
    /// Fail the table
    Abort,
}

impl From<CliUnresolvedKeys> for UnresolvedKeyPolicy {
    fn from(cli: CliUnresolvedKeys) -> Self {
        match cli {
            CliUnresolvedKeys::Skip => UnresolvedKeyPolicy::Skip,
            CliUnresolvedKeys::Null => UnresolvedKeyPolicy::InsertNull,
            CliUnresolvedKeys::Abort => UnresolvedKeyPolicy::Abort,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Property listing ETL: CSV to normalized SQLite tables",
    long_about = "Extracts a wide property CSV, cleans it, splits it into seven tables \
                  and loads them with generated keys propagated to child tables.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  PROPERTY_ETL_DATABASE    Database path used when --database is absent\n\n\
                  EXAMPLES:\n  \
                  # Load into a fresh database\n  \
                  property-etl -i sql/fake_data.csv -d home.db --init-schema\n\n  \
                  # Keep going after failures and keep partial rows\n  \
                  property-etl -i data.csv --on-failure continue --unresolved null --non-atomic"
)]
struct Args {
    /// Path to the CSV file to load
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// SQLite database file
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Create the target tables if they do not exist
    #[arg(long)]
    init_schema: bool,

    /// JSON configuration file; command line flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Tie-breaking rule for the rounded decimal columns
    #[arg(long, value_enum)]
    rounding_mode: Option<CliRoundingMode>,

    /// What to do after a table fails to load
    #[arg(long, value_enum)]
    on_failure: Option<CliFailurePolicy>,

    /// What to do with rows whose foreign key cannot be resolved
    #[arg(long, value_enum)]
    unresolved: Option<CliUnresolvedKeys>,

    /// Commit each insert on its own instead of one transaction for the load
    #[arg(long)]
    non_atomic: bool,

    /// Write the cleaned unified table to this CSV file
    #[arg(long)]
    export_cleaned: Option<PathBuf>,

    /// Write a JSON run report to this file
    #[arg(short, long)]
    report: Option<PathBuf>,

    /// Output the JSON run report to stdout instead of a summary
    ///
    /// Disables all progress logs.
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled so stdout
/// only carries the JSON report.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    // Load environment variables from .env file
    dotenv().ok();

    let config = build_config(&args)?;
    debug!("Configuration: {:?}", config);

    info!("Opening database: {}", config.database.path.display());
    let mut conn = Connection::open(&config.database.path)?;
    conn.pragma_update(None, "foreign_keys", true)?;

    let pipeline = EtlPipeline::builder().config(config).build()?;
    let report = pipeline.run(&mut conn)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    match report.failure_reason() {
        None => Ok(()),
        Some(reason) => Err(anyhow!(reason)),
    }
}

/// Merge the JSON config file, the environment and the command line, in rising priority.
fn build_config(args: &Args) -> Result<EtlConfig> {
    let base = match &args.config {
        Some(path) => EtlConfig::from_json_file(path)?,
        None => EtlConfig::default(),
    };

    let mut builder = EtlConfig::builder().from_config(base);

    if let Some(input) = &args.input {
        builder = builder.input_path(input);
    }

    let database = args
        .database
        .clone()
        .or_else(|| env::var(DATABASE_ENV_VAR).ok().map(PathBuf::from));
    if let Some(path) = database {
        builder = builder.database_path(path);
    }

    if args.init_schema {
        builder = builder.create_schema(true);
    }
    if let Some(mode) = args.rounding_mode {
        builder = builder.rounding_mode(mode.into());
    }
    if let Some(policy) = args.on_failure {
        builder = builder.failure_policy(policy.into());
    }
    if let Some(policy) = args.unresolved {
        builder = builder.unresolved_keys(policy.into());
    }
    if args.non_atomic {
        builder = builder.atomic(false);
    }
    if let Some(path) = &args.export_cleaned {
        builder = builder.export_cleaned(path);
    }
    if let Some(path) = &args.report {
        builder = builder.report_path(path);
    }

    Ok(builder.build()?)
}

/// Print the row counts of a run.
///
/// Uses `println!` on purpose: this is the primary output of the CLI and
/// must show regardless of log level.
fn print_summary(report: &RunReport) {
    let transform = &report.transform;

    println!();
    println!("{}", "=".repeat(80));
    if report.is_success() {
        println!("ETL COMPLETE");
    } else {
        println!("ETL FINISHED WITH ERRORS");
    }
    println!("{}", "=".repeat(80));
    println!();

    println!("Input: {}", report.input_file.display());
    println!("  Duration: {}ms", report.duration_ms);
    println!(
        "  Rows: {} -> {} ({} negative, {} duplicates removed)",
        transform.rows_before,
        transform.rows_after,
        transform.negative_rows_removed,
        transform.duplicates_removed
    );
    println!();

    println!("Tables:");
    for outcome in &report.load.tables {
        let status = match &outcome.status {
            TableStatus::Loaded => "loaded".to_string(),
            TableStatus::Failed { error } => format!("FAILED: {}", error.message),
            TableStatus::Skipped { reason } => format!("skipped ({})", reason),
        };
        if outcome.rows_unresolved > 0 {
            println!(
                "  {:<14} {:>6} rows, {} unresolved  {}",
                outcome.table, outcome.rows_inserted, outcome.rows_unresolved, status
            );
        } else {
            println!(
                "  {:<14} {:>6} rows  {}",
                outcome.table, outcome.rows_inserted, status
            );
        }
    }
    println!();

    if report.is_success() {
        println!("Data successfully inserted into the database.");
    } else if !report.load.committed {
        println!("No rows were committed.");
    }
}
