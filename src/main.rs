//! Binary entry point for the annofind CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Evaluate criteria against a syntax tree
//! annofind locate request.json
//!
//! # Index the bytecode offsets of one class from a decoder dump
//! annofind offsets events.json
//! ```

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use annofind::bytecode::ClassEvent;
use annofind::cli::{run_locate, run_offsets};
use annofind::error::{AnnofindError, OutputErrorCode};
use annofind::output::{emit_response, ErrorResponse};
use annofind::request::{read_document, LocateRequest};

// ============================================================================
// CLI Structure
// ============================================================================

/// Locate annotation insertion points.
///
/// All output is JSON on stdout; logs go to stderr.
#[derive(Parser, Debug)]
#[command(name = "annofind", version, about = "Locate annotation insertion points")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Log level for tracing output (RUST_LOG takes precedence).
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate criteria against the nodes of a syntax tree.
    Locate {
        /// Request document: `{ tree, criteria, candidates?, events? }`.
        request: PathBuf,
    },
    /// Build the bytecode offset index of one class.
    Offsets {
        /// JSON array of class decoder events.
        events: PathBuf,
    },
}

// ============================================================================
// Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.log_level);

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let error_code = OutputErrorCode::from(&err);
            let response = ErrorResponse::from_error(&err);

            // Errors go to stdout as JSON, like every other response.
            let _ = emit_response(&response, &mut io::stdout());
            let _ = io::stdout().flush();

            ExitCode::from(error_code.code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel) {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Execute the CLI command.
fn execute(cli: Cli) -> Result<(), AnnofindError> {
    match cli.command {
        Command::Locate { request } => execute_locate(&request),
        Command::Offsets { events } => execute_offsets(&events),
    }
}

#[tracing::instrument(skip_all, fields(request = %path.display()))]
fn execute_locate(path: &Path) -> Result<(), AnnofindError> {
    let request: LocateRequest = read_document(path, "request")?;
    let response = run_locate(&request)?;
    emit_response(&response, &mut io::stdout())?;
    Ok(())
}

#[tracing::instrument(skip_all, fields(events = %path.display()))]
fn execute_offsets(path: &Path) -> Result<(), AnnofindError> {
    let events: Vec<ClassEvent> = read_document(path, "event stream")?;
    let response = run_offsets(events)?;
    emit_response(&response, &mut io::stdout())?;
    Ok(())
}
