//! Project validation: lint, test, and build commands run in the workspace.
//!
//! Steps run in a fixed order and each is skipped when its command is empty:
//!
//! 1. **lint**: a failure is recorded but never blocks the run
//! 2. **test**: a failure blocks the run and the build is not attempted
//! 3. **build**: a failure blocks the run
//!
//! Every started step writes `<step>.log`, which is also appended to the run log.

mod step;

pub use step::{ValidationStepResult, ValidationStepStatus};

use crate::context::TaskPaths;
use crate::error::{PipelineError, Result};
use crate::task::TaskDescriptor;
use crate::workspace::WorkspaceHandle;
use std::time::Duration;
use tracing::{info, instrument, warn};

pub const LINT: &str = "lint";
pub const TEST: &str = "test";
pub const BUILD: &str = "build";

/// Outcome of all validation steps, in execution order.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub steps: Vec<ValidationStepResult>,
}

impl ValidationResult {
    pub fn step(&self, name: &str) -> Option<&ValidationStepResult> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// Advisory lint failure, if any.
    pub fn lint_failure(&self) -> Option<PipelineError> {
        self.step(LINT)
            .filter(|s| s.is_failure())
            .map(|s| PipelineError::Lint(s.message.clone().unwrap_or_default()))
    }

    /// The blocking failure of this validation, if any.
    pub fn ensure_passed(&self) -> Result<()> {
        for step in self.steps.iter().filter(|s| s.is_failure()) {
            let message = step.message.clone().unwrap_or_default();
            match step.name.as_str() {
                TEST => return Err(PipelineError::Test(message)),
                BUILD => return Err(PipelineError::Build(message)),
                _ => {}
            }
        }
        Ok(())
    }

    /// Compact `lint=pass test=fail build=skip` summary.
    pub fn summary(&self) -> String {
        self.steps
            .iter()
            .map(|s| format!("{}={}", s.name, s.status))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub struct ValidationRunner {
    timeout: Duration,
}

impl ValidationRunner {
    pub fn new(timeout_seconds: u64) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_seconds),
        }
    }

    /// Run lint, test, and build for a task.
    ///
    /// Step failures are reported in the result, not as errors; only writing to the run
    /// log can fail here.
    #[instrument(skip_all, fields(task = %task.id))]
    pub fn validate(
        &self,
        handle: &WorkspaceHandle,
        task: &TaskDescriptor,
        paths: &TaskPaths,
    ) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        let lint = self.run(LINT, &task.lint_command, handle, paths)?;
        if lint.is_failure() {
            warn!("lint failed; continuing with tests");
        }
        result.steps.push(lint);

        let test = self.run(TEST, &task.test_command, handle, paths)?;
        let tests_failed = test.is_failure();
        result.steps.push(test);

        if tests_failed {
            result
                .steps
                .push(ValidationStepResult::skip(BUILD, "not reached: tests failed"));
        } else {
            let build = self.run(BUILD, &task.build_command, handle, paths)?;
            result.steps.push(build);
        }

        info!(summary = %result.summary(), "validation finished");
        Ok(result)
    }

    fn run(
        &self,
        name: &str,
        command: &str,
        handle: &WorkspaceHandle,
        paths: &TaskPaths,
    ) -> Result<ValidationStepResult> {
        if command.trim().is_empty() {
            paths.log_line(&format!("{}: skipped (no command configured)", name))?;
            return Ok(ValidationStepResult::skip(name, "no command configured"));
        }

        let log_path = paths.step_log(name);
        info!(step = name, command, "running validation step");
        let result = step::run_step(name, command, &handle.path, &log_path, self.timeout);

        paths.append_section(&format!("{}: {}", name, command), &log_path)?;
        paths.log_line(&format!("{}: {}", name, result.status))?;
        Ok(result)
    }
}
