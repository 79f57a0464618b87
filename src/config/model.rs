//! Config struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the task execution pipeline.
///
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Project settings
    // =========================================================================
    /// Canonical project checkout used when neither the task nor its project entry names one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_path: Option<PathBuf>,

    /// Per-project capability records, matched against the task's `projectId`.
    #[serde(default)]
    pub projects: Vec<ProjectConfig>,

    // =========================================================================
    // Workspace settings
    // =========================================================================
    /// Directory that holds one worktree per running task.
    #[serde(default = "default_worktrees_dir")]
    pub worktrees_dir: PathBuf,

    /// Directory for per-task run logs and transcripts.
    #[serde(default = "default_logs_dir")]
    pub logs_dir: PathBuf,

    /// Prefix for task branch names (`{prefix}/{project}/task-{id}`).
    #[serde(default = "default_branch_prefix")]
    pub branch_prefix: String,

    // =========================================================================
    // Git settings
    // =========================================================================
    /// Remote the task branch is pushed to.
    #[serde(default = "default_remote")]
    pub remote: String,

    /// Target branch for review requests. Defaults to the canonical checkout's current branch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_branch: Option<String>,

    // =========================================================================
    // Stage settings
    // =========================================================================
    /// Code-generation agent invocation.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Lint/test/build execution.
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Issue tracker and review host.
    #[serde(default)]
    pub tracker: TrackerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_path: None,
            projects: Vec::new(),
            worktrees_dir: default_worktrees_dir(),
            logs_dir: default_logs_dir(),
            branch_prefix: default_branch_prefix(),
            remote: default_remote(),
            base_branch: None,
            agent: AgentConfig::default(),
            validation: ValidationConfig::default(),
            tracker: TrackerConfig::default(),
        }
    }
}
