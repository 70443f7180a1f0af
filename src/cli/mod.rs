//! CLI module for testboot
//!
//! This module provides the command-line interface for the runner.
//!
//! ## Behavior
//!
//! Invocation takes no arguments and runs the whole sequence unconditionally:
//! bootstrap the dependency manager, install project dependencies from the
//! project root, then run the designated test file. The first failing phase
//! aborts the run with exit code 1.
//!
//! ## Modules
//!
//! - `interfaces` - External command execution boundary
//! - `suite` - The install-then-test pipeline
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Pipeline functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod interfaces;
pub mod suite;

use std::fmt;
use std::process;

use clap::Parser;

use self::interfaces::{Phase, ProcessCommandRunner};
use self::suite::{ConsoleReporter, SuitePipeline};

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    /// Create a new CLI error with a message and exit code.
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Bootstraps project tooling and runs the test suite
///
/// There are no positional arguments, flags, or subcommands: the run
/// sequence is fixed and nothing the caller passes can alter it. Unknown
/// arguments are rejected with a usage error.
#[derive(Parser, Debug)]
#[command(name = "testboot")]
#[command(version = VERSION)]
#[command(about = "Installs project dependencies and runs the test suite", long_about = None)]
pub struct Cli {}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. The pipeline
/// returns `CliResult` and errors are handled here.
pub fn run() {
    let _cli = Cli::parse();

    match execute() {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Run the full install-then-test sequence and map failures to diagnostics.
fn execute() -> CliResult<ExitCode> {
    let root = suite::project_root()
        .map_err(|e| CliError::failure(format!("Error installing dependencies: {}", e)))?;

    let pipeline = SuitePipeline::new(root);
    let mut runner = ProcessCommandRunner;
    let mut reporter = ConsoleReporter;

    match pipeline.run(&mut runner, &mut reporter) {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            // The original one-line diagnostics: install failures and test
            // failures are reported with different prefixes.
            let message = match e.phase() {
                Some(Phase::TestExecution) => format!("Error running tests: {}", e),
                _ => format!("Error installing dependencies: {}", e),
            };
            Err(CliError::failure(message))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
