//! Error types for perch.
//!
//! Uses thiserror for derive macros and provides user-actionable error messages.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for pipeline operations.
///
/// Each variant maps to a process exit code via [`PipelineError::exit_code`].
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Bad or missing task input, or invalid configuration.
    #[error("{0}")]
    Config(String),

    /// A tool the pipeline shells out to is not installed.
    #[error("missing prerequisite: {0}")]
    Prerequisite(String),

    /// Worktree, branch, or other git operation failed.
    #[error("Git operation failed: {0}")]
    Git(String),

    /// The code-generation agent exited non-zero, timed out, or could not be started.
    #[error("Agent failed: {0}")]
    Agent(String),

    /// The agent finished without modifying the workspace.
    #[error("No changes: {0}")]
    NoOp(String),

    /// Lint reported problems. Advisory only, never aborts a run.
    #[error("Lint failed: {0}")]
    Lint(String),

    /// The project's test command failed.
    #[error("Tests failed: {0}")]
    Test(String),

    /// The project's build command failed.
    #[error("Build failed: {0}")]
    Build(String),

    /// Commit, push, review request, or tracker comment failed.
    #[error("Publish failed: {0}")]
    Publish(String),

    /// The workspace could not be reclaimed.
    #[error("Cleanup failed: {0}")]
    Cleanup(String),
}

impl PipelineError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::Config(_) | PipelineError::Prerequisite(_) => {
                exit_codes::INVALID_INPUT
            }
            PipelineError::Git(_) => exit_codes::WORKSPACE_FAILURE,
            PipelineError::Agent(_)
            | PipelineError::NoOp(_)
            | PipelineError::Lint(_)
            | PipelineError::Test(_)
            | PipelineError::Build(_)
            | PipelineError::Publish(_) => exit_codes::TASK_FAILURE,
            PipelineError::Cleanup(_) => exit_codes::CLEANUP_FAILURE,
        }
    }

    /// Short machine-readable name, used in run events.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Config(_) => "config_error",
            PipelineError::Prerequisite(_) => "prerequisite_error",
            PipelineError::Git(_) => "git_error",
            PipelineError::Agent(_) => "agent_failure",
            PipelineError::NoOp(_) => "noop_error",
            PipelineError::Lint(_) => "lint_failure",
            PipelineError::Test(_) => "test_failure",
            PipelineError::Build(_) => "build_failure",
            PipelineError::Publish(_) => "publish_failure",
            PipelineError::Cleanup(_) => "cleanup_failure",
        }
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
