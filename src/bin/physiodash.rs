//! Physio Dash CLI - Command-line interface for Physio Dash
//!
//! Commands:
//! - days: List the days present in a log
//! - show: Print the dashboard view for one day
//! - run: Interactive navigation session driven by stdin
//! - validate: Report rows that would be dropped on import

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use physio_dash::error::DashboardError;
use physio_dash::parser::ParseOutcome;
use physio_dash::source::{FileSource, RowSource};
use physio_dash::{DashboardConfig, DashboardController, DashboardView, PRODUCER_NAME, VERSION};

/// Physio Dash - Day-by-day charts for physiotherapy recovery logs
#[derive(Parser)]
#[command(name = "physiodash")]
#[command(version = VERSION)]
#[command(about = "Navigate physio logs day by day and emit chart payloads", long_about = None)]
struct Cli {
    /// Config file (defaults to ~/.config/physio-dash/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the days present in a log
    Days {
        /// Input file (.csv, .json, .ndjson or .jsonl); repeat to merge several exports
        #[arg(short, long, required = true)]
        input: Vec<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the dashboard view for one day
    Show {
        /// Input file (.csv, .json, .ndjson or .jsonl); repeat to merge several exports
        #[arg(short, long, required = true)]
        input: Vec<PathBuf>,

        /// Day to show (YYYY-MM-DD); defaults to the configured start day
        #[arg(long)]
        day: Option<NaiveDate>,

        /// Output format (pretty on a terminal, compact otherwise)
        #[arg(long)]
        output_format: Option<OutputFormat>,
    },

    /// Interactive session: reads commands from stdin, writes one JSON line per command
    Run {
        /// Input file (.csv, .json, .ndjson or .jsonl); repeat to merge several exports
        #[arg(short, long, required = true)]
        input: Vec<PathBuf>,

        /// Buffer output instead of flushing after each command
        #[arg(long)]
        no_flush: bool,
    },

    /// Report rows that would be dropped on import
    Validate {
        /// Input file (.csv, .json, .ndjson or .jsonl); repeat to merge several exports
        #[arg(short, long, required = true)]
        input: Vec<PathBuf>,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Single-line JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), PhysioCliError> {
    let (config, ignored) = DashboardConfig::resolve(cli.config.as_deref())?;
    init_logging(&config);
    if let Some(e) = ignored {
        warn!(error = %e, "ignoring invalid config file");
    }

    match cli.command {
        Commands::Days { input, json } => cmd_days(config, &input, json),
        Commands::Show {
            input,
            day,
            output_format,
        } => cmd_show(config, &input, day, output_format),
        Commands::Run { input, no_flush } => cmd_run(config, &input, !no_flush),
        Commands::Validate { input, json } => cmd_validate(&config, &input, json),
    }
}

/// Logs go to stderr so stdout stays machine-readable. `RUST_LOG` wins over the config level.
fn init_logging(config: &DashboardConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    // A second init (e.g. under a test harness) is harmless
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn open_sources(inputs: &[PathBuf]) -> Result<Vec<FileSource>, PhysioCliError> {
    Ok(inputs
        .iter()
        .map(FileSource::open)
        .collect::<Result<Vec<_>, _>>()?)
}

fn load_controller(config: DashboardConfig, inputs: &[PathBuf]) -> Result<DashboardController, PhysioCliError> {
    let sources = open_sources(inputs)?;
    let sources: Vec<&dyn RowSource> = sources.iter().map(|s| s as &dyn RowSource).collect();

    let mut controller = DashboardController::new(config);
    controller.reimport_from_all(&sources)?;
    Ok(controller)
}

fn cmd_days(config: DashboardConfig, input: &[PathBuf], json: bool) -> Result<(), PhysioCliError> {
    let controller = load_controller(config, input)?;
    let view = controller.view()?;

    let report = DaysReport {
        days: controller
            .day_index()
            .map(|index| index.days().to_vec())
            .unwrap_or_default(),
        dropped_rows: view.warning.as_ref().map(|w| w.dropped).unwrap_or(0),
        variant: view.variant.as_str().to_string(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for day in &report.days {
            println!("{}", day.format("%Y-%m-%d"));
        }
        println!();
        println!("Days:         {}", report.days.len());
        println!("Variant:      {}", report.variant);
        println!("Dropped rows: {}", report.dropped_rows);
    }

    Ok(())
}

fn cmd_show(
    config: DashboardConfig,
    input: &[PathBuf],
    day: Option<NaiveDate>,
    output_format: Option<OutputFormat>,
) -> Result<(), PhysioCliError> {
    let mut controller = load_controller(config, input)?;

    let view = match day {
        Some(day) => controller.go_to_date(day)?,
        None => controller.view()?,
    };

    let format = output_format.unwrap_or_else(|| {
        if atty::is(atty::Stream::Stdout) {
            OutputFormat::JsonPretty
        } else {
            OutputFormat::Json
        }
    });

    println!("{}", format_view(&view, &format)?);
    Ok(())
}

fn cmd_run(config: DashboardConfig, input: &[PathBuf], flush: bool) -> Result<(), PhysioCliError> {
    let mut controller = load_controller(config, input)?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    if atty::is(atty::Stream::Stdin) {
        eprintln!("Commands: prev, next, first, last, goto <YYYY-MM-DD>, load <file>, quit");
    }

    writeln!(stdout, "{}", serde_json::to_string(&controller.view()?)?)?;
    if flush {
        stdout.flush()?;
    }

    for line in stdin.lock().lines() {
        let line = line?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        let output = match parse_session_command(trimmed) {
            Ok(SessionCommand::Quit) => break,
            Ok(command) => match apply_session_command(&mut controller, command) {
                Ok(view) => serde_json::to_string(&view)?,
                Err(e) => serde_json::to_string(&CliError::from(e))?,
            },
            Err(e) => serde_json::to_string(&CliError::from(e))?,
        };

        writeln!(stdout, "{}", output)?;
        if flush {
            stdout.flush()?;
        }
    }

    stdout.flush()?;
    Ok(())
}

fn cmd_validate(config: &DashboardConfig, input: &[PathBuf], json: bool) -> Result<(), PhysioCliError> {
    let sources = open_sources(input)?;
    let parser = config.parser();

    let mut outcome = ParseOutcome::default();
    for source in &sources {
        outcome = outcome.merge(parser.parse(&source.fetch()?));
    }

    let report = ValidationReport {
        producer: PRODUCER_NAME.to_string(),
        version: VERSION.to_string(),
        sources: sources.iter().map(|s| s.describe()).collect(),
        total_rows: outcome.total_rows,
        valid_rows: outcome.dataset.len(),
        dropped_rows: outcome.dropped_count(),
        days: outcome.dataset.days().len(),
        errors: outcome
            .dropped
            .iter()
            .map(|e| ValidationErrorDetail {
                row: e.row,
                error: e.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Sources:      {}", report.sources.join(", "));
        println!("Total rows:   {}", report.total_rows);
        println!("Valid rows:   {}", report.valid_rows);
        println!("Dropped rows: {}", report.dropped_rows);
        println!("Days:         {}", report.days);

        if !report.errors.is_empty() {
            println!("\nDropped:");
            for err in &report.errors {
                println!("  - {}", err.error);
            }
        }
    }

    if report.dropped_rows > 0 {
        Err(PhysioCliError::ValidationFailed(report.dropped_rows))
    } else {
        Ok(())
    }
}

// Session commands

#[derive(Debug, PartialEq)]
enum SessionCommand {
    Previous,
    Next,
    First,
    Last,
    GoTo(NaiveDate),
    Load(PathBuf),
    Quit,
}

fn parse_session_command(line: &str) -> Result<SessionCommand, PhysioCliError> {
    let mut parts = line.splitn(2, char::is_whitespace);
    let verb = parts.next().unwrap_or_default().to_ascii_lowercase();
    let arg = parts.next().map(str::trim).filter(|a| !a.is_empty());

    match (verb.as_str(), arg) {
        ("prev" | "previous", None) => Ok(SessionCommand::Previous),
        ("next", None) => Ok(SessionCommand::Next),
        ("first", None) => Ok(SessionCommand::First),
        ("last", None) => Ok(SessionCommand::Last),
        ("quit" | "exit", None) => Ok(SessionCommand::Quit),
        ("goto", Some(date)) => NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map(SessionCommand::GoTo)
            .map_err(|e| PhysioCliError::BadCommand(format!("{}: {}", line, e))),
        ("load", Some(path)) => Ok(SessionCommand::Load(PathBuf::from(path))),
        _ => Err(PhysioCliError::BadCommand(line.to_string())),
    }
}

fn apply_session_command(
    controller: &mut DashboardController,
    command: SessionCommand,
) -> Result<DashboardView, PhysioCliError> {
    let view = match command {
        SessionCommand::Previous => controller.previous()?,
        SessionCommand::Next => controller.next()?,
        SessionCommand::First => controller.first()?,
        SessionCommand::Last => controller.last()?,
        SessionCommand::GoTo(day) => controller.go_to_date(day)?,
        SessionCommand::Load(path) => {
            let source = FileSource::open(path)?;
            controller.reimport_from(&source)?
        }
        SessionCommand::Quit => controller.view()?,
    };
    Ok(view)
}

// Helper functions

fn format_view(view: &DashboardView, format: &OutputFormat) -> Result<String, PhysioCliError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(view)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(view)?),
    }
}

// Error types

#[derive(Debug)]
enum PhysioCliError {
    Io(io::Error),
    Dashboard(DashboardError),
    Json(serde_json::Error),
    ValidationFailed(usize),
    BadCommand(String),
}

impl From<io::Error> for PhysioCliError {
    fn from(e: io::Error) -> Self {
        PhysioCliError::Io(e)
    }
}

impl From<DashboardError> for PhysioCliError {
    fn from(e: DashboardError) -> Self {
        PhysioCliError::Dashboard(e)
    }
}

impl From<serde_json::Error> for PhysioCliError {
    fn from(e: serde_json::Error) -> Self {
        PhysioCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<PhysioCliError> for CliError {
    fn from(e: PhysioCliError) -> Self {
        match e {
            PhysioCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            PhysioCliError::Dashboard(e) => {
                let hint = match &e {
                    DashboardError::EmptyDataset { .. } => {
                        "Run 'physiodash validate' to see which rows were dropped"
                    }
                    DashboardError::UnknownDay(_) => "Run 'physiodash days' to list available days",
                    DashboardError::SourceFetch(_) => "Check that the file exists and is CSV, JSON or NDJSON",
                    DashboardError::Config(_) => "Check the config file and PHYSIO_DASH_* variables",
                    DashboardError::Json(_) => "Check JSON syntax",
                };
                CliError {
                    code: e.code().to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            PhysioCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            PhysioCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} row(s) would be dropped", count),
                hint: Some("Fix the listed datetime cells and retry".to_string()),
            },
            PhysioCliError::BadCommand(line) => CliError {
                code: "UNKNOWN_COMMAND".to_string(),
                message: format!("Cannot interpret command: {}", line),
                hint: Some(
                    "Use prev, next, first, last, goto <YYYY-MM-DD>, load <file> or quit".to_string(),
                ),
            },
        }
    }
}

// Report types

#[derive(Serialize)]
struct DaysReport {
    days: Vec<NaiveDate>,
    dropped_rows: usize,
    variant: String,
}

#[derive(Serialize)]
struct ValidationReport {
    producer: String,
    version: String,
    sources: Vec<String>,
    total_rows: usize,
    valid_rows: usize,
    dropped_rows: usize,
    days: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(Serialize)]
struct ValidationErrorDetail {
    row: usize,
    error: String,
}
