//! The install-then-test pipeline
//!
//! ## PhaseReporter Trait
//!
//! The pipeline uses a `PhaseReporter` trait to separate progress reporting
//! from execution. This allows for custom output formats (JSON, quiet CI
//! mode, etc.) by implementing the trait.
//!
//! ## I/O Boundaries
//!
//! External command execution is abstracted via the `CommandRunner` trait in
//! `interfaces.rs`, so the ordering and short-circuit behavior here can be
//! exercised with scripted doubles instead of real processes.

use std::env;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use super::interfaces::{CommandRunner, CommandSpec, Phase, RunnerError};

/// Interpreter used to drive both the package manager and the test runner.
const PYTHON: &str = "python3";

/// Test file the run is pinned to, relative to the project root.
const TEST_TARGET: &str = "tests/test_llm_router.py";

// ============================================================================
// Phase Reporter Trait
// ============================================================================

/// Trait for reporting pipeline progress.
///
/// Reporting is write-only: nothing an implementation does can change the
/// command sequence or the exit code.
pub trait PhaseReporter {
    /// Called just before a phase's command is spawned
    fn on_phase_start(&mut self, _phase: Phase) {}

    /// Called when a phase's command has finished (or failed to start)
    fn on_phase_complete(&mut self, phase: Phase, outcome: &PhaseOutcome);

    /// Called once after the last phase, successful or not
    fn on_run_complete(&mut self, summary: &RunSummary);
}

/// Result of one phase
#[derive(Debug)]
pub enum PhaseOutcome {
    Succeeded(Duration),
    Failed(Duration, String),
}

/// Summary of a whole run
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub duration: Duration,
}

/// Default console reporter
#[derive(Default)]
pub struct ConsoleReporter;

impl PhaseReporter for ConsoleReporter {
    fn on_phase_start(&mut self, phase: Phase) {
        eprintln!("\x1b[1m=== {} ===\x1b[0m", phase);
    }

    fn on_phase_complete(&mut self, phase: Phase, outcome: &PhaseOutcome) {
        match outcome {
            PhaseOutcome::Succeeded(d) => {
                eprintln!("{} \x1b[32mok\x1b[0m ({:.2}s)", phase, d.as_secs_f64());
            }
            PhaseOutcome::Failed(d, error) => {
                eprintln!("{} \x1b[31mfailed\x1b[0m ({:.2}s)", phase, d.as_secs_f64());
                eprintln!("\x1b[31m{}\x1b[0m", error);
            }
        }
    }

    fn on_run_complete(&mut self, summary: &RunSummary) {
        let color = if summary.failed > 0 {
            "\x1b[1;31m"
        } else {
            "\x1b[1;32m"
        };

        let mut parts = Vec::new();
        if summary.succeeded > 0 {
            parts.push(format!("{} phase(s) completed", summary.succeeded));
        }
        if summary.failed > 0 {
            parts.push(format!("{} failed", summary.failed));
        }

        eprintln!(
            "{}====== {} in {:.2}s ======\x1b[0m",
            color,
            parts.join(", "),
            summary.duration.as_secs_f64()
        );
    }
}

// ============================================================================
// Project root resolution
// ============================================================================

/// Resolve the project root: the directory containing the running executable.
///
/// The dependency manifest lives next to the binary, so the install and test
/// phases run from here regardless of the caller's working directory.
pub fn project_root() -> Result<PathBuf, RunnerError> {
    let exe = env::current_exe().map_err(|e| RunnerError::ProjectRoot(e.to_string()))?;
    exe.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| RunnerError::ProjectRoot("executable has no parent directory".to_string()))
}

// ============================================================================
// Suite Pipeline
// ============================================================================

/// The fixed install-then-test command sequence.
///
/// Holds the resolved project root; everything else about the run is
/// constant. Each phase's command is awaited to completion before the next
/// begins and the first failure aborts the sequence.
pub struct SuitePipeline {
    project_root: PathBuf,
}

impl SuitePipeline {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
        }
    }

    /// Install the dependency manager, then the project's dependencies.
    ///
    /// The dependency install runs with the working directory set to the
    /// project root, after the bootstrap: the manifest it reads lives there.
    /// The bootstrap itself inherits the caller's working directory.
    pub fn install_dependencies<R: CommandRunner, P: PhaseReporter>(
        &self,
        runner: &mut R,
        reporter: &mut P,
    ) -> Result<(), RunnerError> {
        self.run_phase(runner, reporter, self.bootstrap_spec())?;
        self.run_phase(runner, reporter, self.install_spec())?;
        Ok(())
    }

    /// Run the pinned test file through the dependency manager.
    pub fn run_tests<R: CommandRunner, P: PhaseReporter>(
        &self,
        runner: &mut R,
        reporter: &mut P,
    ) -> Result<(), RunnerError> {
        self.run_phase(runner, reporter, self.test_spec())
    }

    /// Full sequence: both install phases, then the tests, then the summary
    /// event. The summary fires whether or not the run succeeded.
    pub fn run<R: CommandRunner, P: PhaseReporter>(
        &self,
        runner: &mut R,
        reporter: &mut P,
    ) -> Result<(), RunnerError> {
        let started = Instant::now();

        let result = self
            .install_dependencies(runner, reporter)
            .and_then(|_| self.run_tests(runner, reporter));

        let (succeeded, failed) = match &result {
            Ok(()) => (3, 0),
            Err(e) => (e.phase().map_or(0, Phase::position), 1),
        };

        reporter.on_run_complete(&RunSummary {
            succeeded,
            failed,
            duration: started.elapsed(),
        });

        result
    }

    fn bootstrap_spec(&self) -> CommandSpec {
        CommandSpec::new(
            Phase::BootstrapInstall,
            PYTHON,
            &["-m", "pip", "install", "poetry"],
        )
    }

    fn install_spec(&self) -> CommandSpec {
        CommandSpec::new(Phase::DependencyInstall, PYTHON, &["-m", "poetry", "install"])
            .with_cwd(&self.project_root)
    }

    fn test_spec(&self) -> CommandSpec {
        CommandSpec::new(
            Phase::TestExecution,
            PYTHON,
            &["-m", "poetry", "run", "pytest", TEST_TARGET],
        )
        .with_cwd(&self.project_root)
    }

    /// Run a single phase's command and convert a non-zero exit into an error.
    fn run_phase<R: CommandRunner, P: PhaseReporter>(
        &self,
        runner: &mut R,
        reporter: &mut P,
        spec: CommandSpec,
    ) -> Result<(), RunnerError> {
        reporter.on_phase_start(spec.phase);
        tracing::info!(phase = %spec.phase, command = %spec.display_line(), "starting phase");

        let started = Instant::now();
        let result = runner.run(&spec);
        let elapsed = started.elapsed();

        match result {
            Ok(status) if status.success => {
                reporter.on_phase_complete(spec.phase, &PhaseOutcome::Succeeded(elapsed));
                tracing::info!(phase = %spec.phase, "phase complete");
                Ok(())
            }
            Ok(status) => {
                let err = RunnerError::CommandFailed {
                    phase: spec.phase,
                    status,
                };
                reporter.on_phase_complete(
                    spec.phase,
                    &PhaseOutcome::Failed(elapsed, err.to_string()),
                );
                tracing::error!(phase = %spec.phase, %status, "phase failed");
                Err(err)
            }
            Err(err) => {
                reporter.on_phase_complete(
                    spec.phase,
                    &PhaseOutcome::Failed(elapsed, err.to_string()),
                );
                tracing::error!(phase = %spec.phase, error = %err, "phase failed to start");
                Err(err)
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cli::interfaces::CommandStatus;
    use std::io;

    /// What a scripted runner should do for one invocation
    enum Scripted {
        Exit(CommandStatus),
        SpawnError,
    }

    /// Command runner double that replays a script and records every
    /// invocation it sees.
    struct ScriptedRunner {
        script: Vec<Scripted>,
        invocations: Vec<CommandSpec>,
    }

    impl ScriptedRunner {
        fn new(script: Vec<Scripted>) -> Self {
            Self {
                script: script.into_iter().rev().collect(),
                invocations: Vec::new(),
            }
        }

        fn phases_run(&self) -> Vec<Phase> {
            self.invocations.iter().map(|s| s.phase).collect()
        }
    }

    impl CommandRunner for ScriptedRunner {
        fn run(&mut self, spec: &CommandSpec) -> Result<CommandStatus, RunnerError> {
            self.invocations.push(spec.clone());
            match self.script.pop() {
                Some(Scripted::Exit(status)) => Ok(status),
                Some(Scripted::SpawnError) => Err(RunnerError::Spawn {
                    phase: spec.phase,
                    source: io::Error::new(io::ErrorKind::NotFound, "scripted spawn failure"),
                }),
                None => panic!("runner invoked more times than scripted"),
            }
        }
    }

    /// Reporter double that records the events it receives.
    #[derive(Default)]
    struct RecordingReporter {
        started: Vec<Phase>,
        completed: Vec<(Phase, bool)>,
        summary: Option<(usize, usize)>,
    }

    impl PhaseReporter for RecordingReporter {
        fn on_phase_start(&mut self, phase: Phase) {
            self.started.push(phase);
        }

        fn on_phase_complete(&mut self, phase: Phase, outcome: &PhaseOutcome) {
            self.completed
                .push((phase, matches!(outcome, PhaseOutcome::Succeeded(_))));
        }

        fn on_run_complete(&mut self, summary: &RunSummary) {
            self.summary = Some((summary.succeeded, summary.failed));
        }
    }

    fn all_ok() -> ScriptedRunner {
        ScriptedRunner::new(vec![
            Scripted::Exit(CommandStatus::OK),
            Scripted::Exit(CommandStatus::OK),
            Scripted::Exit(CommandStatus::OK),
        ])
    }

    #[test]
    fn test_successful_run_invokes_all_phases_in_order() {
        let pipeline = SuitePipeline::new("/opt/project");
        let mut runner = all_ok();
        let mut reporter = RecordingReporter::default();

        pipeline.run(&mut runner, &mut reporter).unwrap();

        assert_eq!(
            runner.phases_run(),
            vec![
                Phase::BootstrapInstall,
                Phase::DependencyInstall,
                Phase::TestExecution
            ]
        );
        assert_eq!(reporter.summary, Some((3, 0)));
    }

    #[test]
    fn test_no_command_is_invoked_more_than_once() {
        let pipeline = SuitePipeline::new("/opt/project");
        let mut runner = all_ok();
        let mut reporter = RecordingReporter::default();

        pipeline.run(&mut runner, &mut reporter).unwrap();

        for phase in [
            Phase::BootstrapInstall,
            Phase::DependencyInstall,
            Phase::TestExecution,
        ] {
            let count = runner.phases_run().iter().filter(|p| **p == phase).count();
            assert_eq!(count, 1, "{} invoked {} times", phase, count);
        }
    }

    #[test]
    fn test_commands_match_the_fixed_sequence() {
        let pipeline = SuitePipeline::new("/opt/project");
        let mut runner = all_ok();
        let mut reporter = RecordingReporter::default();

        pipeline.run(&mut runner, &mut reporter).unwrap();

        let lines: Vec<String> = runner
            .invocations
            .iter()
            .map(CommandSpec::display_line)
            .collect();
        assert_eq!(
            lines,
            vec![
                "python3 -m pip install poetry",
                "python3 -m poetry install",
                "python3 -m poetry run pytest tests/test_llm_router.py",
            ]
        );
    }

    #[test]
    fn test_install_and_test_run_from_project_root() {
        let root = PathBuf::from("/opt/project");
        let pipeline = SuitePipeline::new(&root);
        let mut runner = all_ok();
        let mut reporter = RecordingReporter::default();

        pipeline.run(&mut runner, &mut reporter).unwrap();

        // The bootstrap inherits the caller's working directory; the install
        // and test phases are pinned to the project root.
        assert_eq!(runner.invocations[0].cwd, None);
        assert_eq!(runner.invocations[1].cwd, Some(root.clone()));
        assert_eq!(runner.invocations[2].cwd, Some(root));
    }

    #[test]
    fn test_bootstrap_failure_stops_before_install() {
        let pipeline = SuitePipeline::new("/opt/project");
        let mut runner = ScriptedRunner::new(vec![Scripted::Exit(CommandStatus::failed(1))]);
        let mut reporter = RecordingReporter::default();

        let err = pipeline.run(&mut runner, &mut reporter).unwrap_err();

        assert_eq!(err.phase(), Some(Phase::BootstrapInstall));
        assert_eq!(runner.phases_run(), vec![Phase::BootstrapInstall]);
        assert_eq!(reporter.summary, Some((0, 1)));
    }

    #[test]
    fn test_install_failure_never_reaches_tests() {
        let pipeline = SuitePipeline::new("/opt/project");
        let mut runner = ScriptedRunner::new(vec![
            Scripted::Exit(CommandStatus::OK),
            Scripted::Exit(CommandStatus::failed(2)),
        ]);
        let mut reporter = RecordingReporter::default();

        let err = pipeline.run(&mut runner, &mut reporter).unwrap_err();

        assert_eq!(err.phase(), Some(Phase::DependencyInstall));
        assert_eq!(
            runner.phases_run(),
            vec![Phase::BootstrapInstall, Phase::DependencyInstall]
        );
        assert!(!runner.phases_run().contains(&Phase::TestExecution));
    }

    #[test]
    fn test_test_failure_after_successful_install() {
        let pipeline = SuitePipeline::new("/opt/project");
        let mut runner = ScriptedRunner::new(vec![
            Scripted::Exit(CommandStatus::OK),
            Scripted::Exit(CommandStatus::OK),
            Scripted::Exit(CommandStatus::failed(1)),
        ]);
        let mut reporter = RecordingReporter::default();

        let err = pipeline.run(&mut runner, &mut reporter).unwrap_err();

        assert_eq!(err.phase(), Some(Phase::TestExecution));
        assert_eq!(runner.phases_run().len(), 3);
        assert_eq!(reporter.summary, Some((2, 1)));
    }

    #[test]
    fn test_spawn_failure_is_reported_as_spawn_error() {
        let pipeline = SuitePipeline::new("/opt/project");
        let mut runner = ScriptedRunner::new(vec![Scripted::SpawnError]);
        let mut reporter = RecordingReporter::default();

        let err = pipeline
            .install_dependencies(&mut runner, &mut reporter)
            .unwrap_err();

        assert!(matches!(
            err,
            RunnerError::Spawn {
                phase: Phase::BootstrapInstall,
                ..
            }
        ));
    }

    #[test]
    fn test_reporter_sees_every_phase_lifecycle_event() {
        let pipeline = SuitePipeline::new("/opt/project");
        let mut runner = all_ok();
        let mut reporter = RecordingReporter::default();

        pipeline.run(&mut runner, &mut reporter).unwrap();

        assert_eq!(reporter.started.len(), 3);
        assert_eq!(reporter.completed.len(), 3);
        assert!(reporter.completed.iter().all(|(_, ok)| *ok));
    }

    #[test]
    fn test_failed_phase_completes_with_failure_outcome() {
        let pipeline = SuitePipeline::new("/opt/project");
        let mut runner = ScriptedRunner::new(vec![
            Scripted::Exit(CommandStatus::OK),
            Scripted::Exit(CommandStatus::failed(1)),
        ]);
        let mut reporter = RecordingReporter::default();

        let _ = pipeline.run(&mut runner, &mut reporter);

        assert_eq!(
            reporter.completed,
            vec![
                (Phase::BootstrapInstall, true),
                (Phase::DependencyInstall, false)
            ]
        );
    }

    #[test]
    fn test_install_dependencies_alone_runs_two_phases() {
        let pipeline = SuitePipeline::new("/opt/project");
        let mut runner = ScriptedRunner::new(vec![
            Scripted::Exit(CommandStatus::OK),
            Scripted::Exit(CommandStatus::OK),
        ]);
        let mut reporter = RecordingReporter::default();

        pipeline
            .install_dependencies(&mut runner, &mut reporter)
            .unwrap();

        assert_eq!(
            runner.phases_run(),
            vec![Phase::BootstrapInstall, Phase::DependencyInstall]
        );
    }
}
