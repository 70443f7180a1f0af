#![forbid(unsafe_code)]
//! Bootstrap-and-test pipeline runner
//!
//! `testboot` prepares a project's Python tooling and runs its test suite in
//! three fixed phases: install the dependency manager (`pip install poetry`),
//! install the project's declared dependencies (`poetry install`, run from
//! the project root where the manifest lives), and invoke the test framework
//! against the project's designated test file. The phases run strictly in
//! order; the first failure aborts the run and the process exits with code 1.
//!
//! ## Panic Policy
//!
//! This codebase follows explicit error handling:
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module
//!   enforces `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.

pub mod cli;

pub use cli::interfaces::{
    CommandRunner, CommandSpec, CommandStatus, Phase, ProcessCommandRunner, RunnerError,
};
pub use cli::suite::{ConsoleReporter, PhaseOutcome, PhaseReporter, RunSummary, SuitePipeline};
