//! Runner I/O boundary interfaces
//!
//! This module defines the trait-based abstraction for external command
//! execution: the pipeline decides *which* commands run in *what* order,
//! while a `CommandRunner` implementation owns the actual spawning. This
//! keeps the ordering and short-circuit logic testable without spawning
//! real processes.
//!
//! The default implementation spawns with inherited stdout/stderr so tool
//! output streams to the terminal in real time, and blocks until the child
//! exits.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use thiserror::Error;

// ============================================================================
// Phases
// ============================================================================

/// One of the three external command invocations in a run, in run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Install the dependency manager itself (`pip install poetry`)
    BootstrapInstall,
    /// Install the project's declared dependencies (`poetry install`)
    DependencyInstall,
    /// Run the designated test file (`poetry run pytest`)
    TestExecution,
}

impl Phase {
    /// Short human label used in logs and diagnostics.
    pub fn label(self) -> &'static str {
        match self {
            Phase::BootstrapInstall => "installing poetry",
            Phase::DependencyInstall => "installing project dependencies",
            Phase::TestExecution => "running tests",
        }
    }

    /// Zero-based position of the phase in the run sequence.
    pub fn position(self) -> usize {
        match self {
            Phase::BootstrapInstall => 0,
            Phase::DependencyInstall => 1,
            Phase::TestExecution => 2,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ============================================================================
// Command specification and outcome
// ============================================================================

/// A fully-specified external command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Which phase of the run this command belongs to
    pub phase: Phase,
    /// Program to spawn
    pub program: String,
    /// Arguments, in order
    pub args: Vec<String>,
    /// Working directory for the child, `None` to inherit the caller's
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(phase: Phase, program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            phase,
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
            cwd: None,
        }
    }

    /// Set the working directory the child runs in.
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Rendered `program arg1 arg2 ...` form for logs.
    pub fn display_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Exit outcome of a child process that ran to completion.
///
/// `code` is `None` when the child was terminated by a signal rather than
/// exiting; that counts as failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandStatus {
    pub success: bool,
    pub code: Option<i32>,
}

impl CommandStatus {
    /// The zero exit status.
    pub const OK: CommandStatus = CommandStatus {
        success: true,
        code: Some(0),
    };

    /// A non-zero exit with the given code.
    pub fn failed(code: i32) -> Self {
        Self {
            success: false,
            code: Some(code),
        }
    }

    pub fn from_exit(status: std::process::ExitStatus) -> Self {
        Self {
            success: status.success(),
            code: status.code(),
        }
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "status {}", code),
            None => write!(f, "no status (terminated by signal)"),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Errors that occur while driving the run's external commands
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The child process could not be started at all (e.g. the interpreter
    /// is not on PATH).
    #[error("{phase} failed to start: {source}")]
    Spawn {
        phase: Phase,
        #[source]
        source: io::Error,
    },

    /// The child ran and exited unsuccessfully.
    #[error("{phase} exited with {status}")]
    CommandFailed { phase: Phase, status: CommandStatus },

    /// The project root (directory containing the executable) could not be
    /// resolved.
    #[error("could not resolve project root: {0}")]
    ProjectRoot(String),
}

impl RunnerError {
    /// The phase whose command produced this error, if any.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            RunnerError::Spawn { phase, .. } | RunnerError::CommandFailed { phase, .. } => {
                Some(*phase)
            }
            RunnerError::ProjectRoot(_) => None,
        }
    }
}

// ============================================================================
// Command Runner Interface
// ============================================================================

/// Spawn external commands and report how they exited.
///
/// Implementations must block until the child exits. Returning
/// `Ok(CommandStatus)` means the child ran to completion (successfully or
/// not); `Err` is reserved for commands that never started.
pub trait CommandRunner {
    fn run(&mut self, spec: &CommandSpec) -> Result<CommandStatus, RunnerError>;
}

// ============================================================================
// Default Implementation (Current Behavior)
// ============================================================================

/// `std::process::Command` execution with inherited stdio.
///
/// Output streams to the terminal in real time, which matters for the
/// install phases (progress bars, resolver output) and for test output.
pub struct ProcessCommandRunner;

impl CommandRunner for ProcessCommandRunner {
    fn run(&mut self, spec: &CommandSpec) -> Result<CommandStatus, RunnerError> {
        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        if let Some(cwd) = &spec.cwd {
            command.current_dir(cwd);
        }

        let status = command.status().map_err(|e| RunnerError::Spawn {
            phase: spec.phase,
            source: e,
        })?;

        Ok(CommandStatus::from_exit(status))
    }
}

// ============================================================================
// Tests
// ============================================================================
