//! rgslog - Command-line interface for RGS session logs
//!
//! Commands:
//! - validate: Check one or more log files against the session-log schema
//! - normalize: Rewrite a log file with NaN values replaced by null
//! - inspect: Print a summary of a log file
//! - schema: Describe the session-log schema

use clap::{Parser, Subcommand, ValueEnum};
use std::collections::HashSet;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};

use rgs_log::pipeline::{parse_upload, to_json, to_json_pretty};
use rgs_log::schema::{session_log_schema, EntitySchema, FieldType, SCHEMA_ID};
use rgs_log::{LogFileError, LogSummary, LIB_VERSION, PRODUCER_NAME};

/// rgslog - Validate and normalize RGS session logs
#[derive(Parser)]
#[command(name = "rgslog")]
#[command(version = LIB_VERSION)]
#[command(about = "Validate and normalize RGS session logs", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate log files (use - for stdin)
    Validate {
        /// Input file paths
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse a log file and write it back with absent values as null
    Normalize {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "json")]
        output_format: OutputFormat,
    },

    /// Print a summary of a log file
    Inspect {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(quiet: bool, verbose: bool) {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("RGSLOG_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    // stdout carries command output, so logs go to stderr
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn run(cli: Cli) -> Result<(), RgsCliError> {
    match cli.command {
        Commands::Validate { inputs, json } => cmd_validate(&inputs, json),

        Commands::Normalize {
            input,
            output,
            output_format,
        } => cmd_normalize(&input, &output, output_format),

        Commands::Inspect { input, json } => cmd_inspect(&input, json),

        Commands::Schema { json_schema } => cmd_schema(json_schema),
    }
}

fn cmd_validate(inputs: &[PathBuf], json: bool) -> Result<(), RgsCliError> {
    let mut files = Vec::with_capacity(inputs.len());

    for input in inputs {
        let bytes = read_input(input)?;
        let error = match parse_upload(&bytes) {
            Ok(log) => {
                debug!(
                    input = %input.display(),
                    session_id = log.header.session_info.session_id,
                    "log file is valid"
                );
                None
            }
            Err(e) => {
                info!(input = %input.display(), error = %e, "log file is invalid");
                Some(FileErrorDetail::from(&e))
            }
        };
        files.push(FileResult {
            input: input.display().to_string(),
            valid: error.is_none(),
            error,
        });
    }

    let invalid_files = files.iter().filter(|f| !f.valid).count();
    let report = ValidationReport {
        total_files: files.len(),
        valid_files: files.len() - invalid_files,
        invalid_files,
        files,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total files:   {}", report.total_files);
        println!("Valid files:   {}", report.valid_files);
        println!("Invalid files: {}", report.invalid_files);

        if report.invalid_files > 0 {
            println!("\nErrors:");
            for file in report.files.iter() {
                if let Some(err) = &file.error {
                    println!("  - {}: {}", file.input, err.message);
                }
            }
        }
    }

    if report.invalid_files > 0 {
        Err(RgsCliError::ValidationFailed(report.invalid_files))
    } else {
        Ok(())
    }
}

fn cmd_normalize(
    input: &Path,
    output: &Path,
    output_format: OutputFormat,
) -> Result<(), RgsCliError> {
    let bytes = read_input(input)?;
    let log = parse_upload(&bytes)?;

    let output_data = match output_format {
        OutputFormat::Json => to_json(&log)?,
        OutputFormat::JsonPretty => to_json_pretty(&log)?,
    };

    if is_stdio(output) {
        println!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
        debug!(output = %output.display(), "normalized log written");
    }

    Ok(())
}

fn cmd_inspect(input: &Path, json: bool) -> Result<(), RgsCliError> {
    let bytes = read_input(input)?;
    let summary = parse_upload(&bytes)?.summary();

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    Ok(())
}

fn print_summary(summary: &LogSummary) {
    let date = summary
        .session_date
        .map(|d| d.to_string())
        .unwrap_or_else(|| "unparsed".to_string());
    let routine = match summary.prescribed_as_routine {
        Some(true) => "yes",
        Some(false) => "no",
        None => "unknown",
    };

    println!("Session Summary");
    println!("===============");
    println!("Session:            {}", summary.session_id);
    println!("Patient:            {}", summary.patient_id);
    println!(
        "Protocol:           {} ({})",
        summary.protocol_name, summary.protocol_id
    );
    println!("Session date:       {}", date);
    println!("Routine:            {}", routine);
    println!("Duration:           {}", summary.protocol_duration);
    println!("Scores:             {}", summary.registered_scores);
    println!("Difficulty updates: {}", summary.difficulty_recomputes);
    println!("IRC users:          {}", summary.irc_users);
    println!(
        "Object events:      {} in {} streams",
        summary.object_events, summary.object_streams
    );
    println!(
        "Tracked positions:  {} across {} entities",
        summary.tracked_positions, summary.tracked_entities
    );
    println!("Kinematic entities: {}", summary.kinematic_entities);
}

fn cmd_schema(json_schema: bool) -> Result<(), RgsCliError> {
    let schema = session_log_schema();

    if json_schema {
        println!(
            "{}",
            serde_json::to_string_pretty(&schema.to_json_schema(SCHEMA_ID))?
        );
        return Ok(());
    }

    println!("Session Log Schema ({} {})", PRODUCER_NAME, LIB_VERSION);
    println!();
    let mut seen = HashSet::new();
    print_entity(schema, &mut seen);
    println!(
        "Float fields accept null; NaN is read as absent. Optional fields are marked with ?."
    );

    Ok(())
}

fn print_entity(schema: &EntitySchema, seen: &mut HashSet<&'static str>) {
    if !seen.insert(schema.name) {
        return;
    }

    println!("{}", schema.name);
    for field in &schema.fields {
        let marker = if field.required { "" } else { "?" };
        println!("  {}{}: {}", field.name, marker, field.ty.describe());
    }
    println!();

    for field in &schema.fields {
        if let Some(nested) = nested_entity(&field.ty) {
            print_entity(nested, seen);
        }
    }
}

fn nested_entity(ty: &FieldType) -> Option<&EntitySchema> {
    match ty {
        FieldType::Entity(schema) => Some(&**schema),
        FieldType::Sequence(inner) | FieldType::Mapping(inner) => nested_entity(inner),
        _ => None,
    }
}

// Helper functions

fn is_stdio(path: &Path) -> bool {
    path.to_string_lossy() == "-"
}

fn read_input(input: &Path) -> Result<Vec<u8>, RgsCliError> {
    if is_stdio(input) {
        let mut buffer = Vec::new();
        io::stdin().read_to_end(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read(input)?)
    }
}

// Error types

#[derive(Debug)]
enum RgsCliError {
    Io(io::Error),
    LogFile(LogFileError),
    Json(serde_json::Error),
    ValidationFailed(usize),
}

impl From<io::Error> for RgsCliError {
    fn from(e: io::Error) -> Self {
        RgsCliError::Io(e)
    }
}

impl From<LogFileError> for RgsCliError {
    fn from(e: LogFileError) -> Self {
        RgsCliError::LogFile(e)
    }
}

impl From<serde_json::Error> for RgsCliError {
    fn from(e: serde_json::Error) -> Self {
        RgsCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<RgsCliError> for CliError {
    fn from(e: RgsCliError) -> Self {
        match e {
            RgsCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            RgsCliError::LogFile(e) => {
                let detail = FileErrorDetail::from(&e);
                let hint = match &e {
                    LogFileError::Validation(_) => "Run 'rgslog validate --json' for details",
                    LogFileError::DecodeError(_) => "Ensure the file is UTF-8 encoded",
                    LogFileError::JsonError(_) => "Check JSON syntax",
                    LogFileError::EncodingError(_) => "Report this log file to the maintainers",
                };
                CliError {
                    code: detail.code,
                    message: detail.message,
                    hint: Some(hint.to_string()),
                }
            }
            RgsCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            RgsCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} log files failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_files: usize,
    valid_files: usize,
    invalid_files: usize,
    files: Vec<FileResult>,
}

#[derive(serde::Serialize)]
struct FileResult {
    input: String,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<FileErrorDetail>,
}

#[derive(serde::Serialize)]
struct FileErrorDetail {
    code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    message: String,
}

impl From<&LogFileError> for FileErrorDetail {
    fn from(e: &LogFileError) -> Self {
        let (code, path) = match e {
            LogFileError::Validation(v) => ("VALIDATION_ERROR", Some(v.path.clone())),
            LogFileError::DecodeError(_) => ("DECODE_ERROR", None),
            LogFileError::JsonError(_) => ("JSON_ERROR", None),
            LogFileError::EncodingError(_) => ("ENCODING_ERROR", None),
        };
        FileErrorDetail {
            code: code.to_string(),
            path,
            message: e.to_string(),
        }
    }
}
