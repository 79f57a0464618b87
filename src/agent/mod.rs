//! Code-generation agent invocation.
//!
//! The agent is an opaque external process: it receives a prompt and a capability
//! allowlist and edits files in the workspace. Its full transcript (stdout and stderr)
//! is written to `agent.log` and copied into the run log whatever the outcome.
//!
//! Invocation is split in two so that template errors surface before a workspace
//! exists: [`AgentInvoker::plan`] renders the prompt and argv without side effects,
//! [`AgentInvoker::run`] writes the prompt file and executes the plan.

pub mod prompt;

use crate::config::AgentConfig;
use crate::context::TaskPaths;
use crate::error::{PipelineError, Result};
use crate::process::{ProcessOutcome, run_logged};
use crate::task::TaskDescriptor;
use crate::workspace::WorkspaceHandle;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;
use tracing::{info, instrument};

/// A fully rendered agent invocation.
#[derive(Debug, Clone)]
pub struct AgentPlan {
    pub prompt: String,
    pub prompt_file: PathBuf,
    /// Program followed by its arguments.
    pub argv: Vec<String>,
    pub transcript_path: PathBuf,
    pub cwd: PathBuf,
}

impl AgentPlan {
    pub fn program(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or_default()
    }
}

/// Result of a successful agent run.
#[derive(Debug, Clone)]
pub struct AgentResult {
    pub exit_code: i32,
    pub transcript_path: PathBuf,
    pub duration: Duration,
}

pub struct AgentInvoker<'a> {
    config: &'a AgentConfig,
}

impl<'a> AgentInvoker<'a> {
    pub fn new(config: &'a AgentConfig) -> Self {
        Self { config }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_seconds)
    }

    /// Render prompt and command line for a task. No side effects.
    pub fn plan(
        &self,
        task: &TaskDescriptor,
        handle: &WorkspaceHandle,
        paths: &TaskPaths,
    ) -> Result<AgentPlan> {
        let prompt = prompt::render_prompt(self.config, task)?;
        let prompt_file = paths.prompt_file();
        let argv = prompt::build_command(self.config, task, handle, &prompt, &prompt_file)?;

        Ok(AgentPlan {
            prompt,
            prompt_file,
            argv,
            transcript_path: paths.agent_log(),
            cwd: handle.path.clone(),
        })
    }

    /// Run the agent inside the workspace.
    ///
    /// Fails with `PipelineError::Agent` on a non-zero exit, a timeout, an interrupt, or
    /// when the program cannot be started. The transcript is appended to the run log in
    /// every case.
    #[instrument(skip_all, fields(program = %plan.program()))]
    pub fn run(&self, plan: &AgentPlan, paths: &TaskPaths) -> Result<AgentResult> {
        std::fs::write(&plan.prompt_file, &plan.prompt).map_err(|e| {
            PipelineError::Agent(format!(
                "failed to write prompt file '{}': {}",
                plan.prompt_file.display(),
                e
            ))
        })?;

        let mut command = Command::new(plan.program());
        command
            .args(&plan.argv[1..])
            .current_dir(&plan.cwd)
            .envs(&self.config.environment);

        info!(timeout_secs = self.config.timeout_seconds, "starting agent");
        let result = run_logged(&mut command, &plan.transcript_path, self.timeout());
        paths.append_section("agent transcript", &plan.transcript_path)?;

        let outcome = result.map_err(|e| PipelineError::Agent(e.to_string()))?;
        self.check(outcome, plan)
    }

    fn check(&self, outcome: ProcessOutcome, plan: &AgentPlan) -> Result<AgentResult> {
        if !outcome.is_success() {
            return Err(PipelineError::Agent(format!(
                "'{}' {} (transcript: {})",
                plan.program(),
                outcome.describe(self.timeout()),
                plan.transcript_path.display()
            )));
        }

        info!(duration_ms = outcome.duration.as_millis() as u64, "agent finished");
        Ok(AgentResult {
            exit_code: 0,
            transcript_path: plan.transcript_path.clone(),
            duration: outcome.duration,
        })
    }
}
