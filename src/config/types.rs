//! Configuration types and defaults for perch.
//!
//! This module defines enums, nested config sections, and default value functions
//! used by the Config struct.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Hosting platform of the issue tracker and review host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// GitHub, driven through the `gh` CLI.
    #[default]
    Github,
    /// GitLab, driven through the `glab` CLI.
    Gitlab,
}

impl Platform {
    /// Parse a platform from a string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "github" => Some(Self::Github),
            "gitlab" => Some(Self::Gitlab),
            _ => None,
        }
    }

    /// CLI used when `tracker.program` is not configured.
    pub fn default_program(self) -> &'static str {
        match self {
            Platform::Github => "gh",
            Platform::Gitlab => "glab",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Github => write!(f, "github"),
            Platform::Gitlab => write!(f, "gitlab"),
        }
    }
}

/// Capability record for one project.
///
/// Values here fill in whatever the task descriptor leaves unset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Identifier matched against the task's `projectId`.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Free-form project type (e.g. `godot`, `rust`). Informational, embedded in the prompt.
    #[serde(rename = "type")]
    pub project_type: String,

    /// Canonical checkout for this project.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lint_command: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_command: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_command: Option<String>,

    /// Unknown fields preserved for forward compatibility.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// Settings for the code-generation agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Command template. Split into arguments first, then each argument is rendered,
    /// so `{prompt}` always stays a single argument.
    ///
    /// Variables: `prompt`, `prompt_file`, `allowed_tools`, `workspace`, `task_id`, `branch`.
    #[serde(default = "default_agent_command")]
    pub command: String,

    /// Capabilities granted to the agent. Unrestricted shell access is rejected by validation.
    #[serde(default = "default_allowed_tools")]
    pub allowed_tools: Vec<String>,

    /// Maximum agent runtime before the process is killed.
    #[serde(default = "default_agent_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Extra environment variables for the agent process.
    #[serde(default)]
    pub environment: BTreeMap<String, String>,

    /// Prompt template. Variables: `task_id`, `title`, `body`, `complexity`,
    /// `project_name`, `project_type`, `source_url`.
    #[serde(default = "default_prompt_template")]
    pub prompt_template: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            command: default_agent_command(),
            allowed_tools: default_allowed_tools(),
            timeout_seconds: default_agent_timeout_seconds(),
            environment: BTreeMap::new(),
            prompt_template: default_prompt_template(),
        }
    }
}

/// Settings for lint/test/build execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Maximum runtime of a single validation step.
    #[serde(default = "default_validation_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_validation_timeout_seconds(),
        }
    }
}

/// Settings for the issue tracker / review host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Platform used when the task does not name one.
    #[serde(default)]
    pub platform: Platform,

    /// Override for the CLI binary (defaults to `gh` or `glab`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,

    /// Label names of the work-item state machine.
    #[serde(default)]
    pub labels: LabelNames,
}

/// Label names used for work-item state transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelNames {
    #[serde(default = "default_label_ready")]
    pub ready: String,
    #[serde(default = "default_label_in_queue")]
    pub in_queue: String,
    #[serde(default = "default_label_in_process")]
    pub in_process: String,
    #[serde(default = "default_label_in_review")]
    pub in_review: String,
}

impl Default for LabelNames {
    fn default() -> Self {
        Self {
            ready: default_label_ready(),
            in_queue: default_label_in_queue(),
            in_process: default_label_in_process(),
            in_review: default_label_in_review(),
        }
    }
}

/// Default prompt handed to the agent.
pub const DEFAULT_PROMPT_TEMPLATE: &str = "\
You are working on the {project_type} project \"{project_name}\".

# Task #{task_id}: {title}

Complexity: {complexity}
Source: {source_url}

## Instructions

{body}

## Rules

- Only edit files inside the current working directory.
- Keep the change focused on this task.
";

// Default value functions for serde
pub(crate) fn default_worktrees_dir() -> PathBuf {
    std::env::temp_dir().join("perch").join("worktrees")
}
pub(crate) fn default_logs_dir() -> PathBuf {
    std::env::temp_dir().join("perch").join("logs")
}
pub(crate) fn default_branch_prefix() -> String {
    "perch".to_string()
}
pub(crate) fn default_remote() -> String {
    "origin".to_string()
}
pub(crate) fn default_agent_command() -> String {
    "claude -p {prompt} --allowedTools {allowed_tools}".to_string()
}
pub(crate) fn default_allowed_tools() -> Vec<String> {
    [
        "Read",
        "Write",
        "Edit",
        "MultiEdit",
        "Glob",
        "Grep",
        "Bash(git status:*)",
        "Bash(git diff:*)",
        "Bash(git log:*)",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
pub(crate) fn default_agent_timeout_seconds() -> u64 {
    3600
}
pub(crate) fn default_validation_timeout_seconds() -> u64 {
    1800
}
pub(crate) fn default_prompt_template() -> String {
    DEFAULT_PROMPT_TEMPLATE.to_string()
}
fn default_label_ready() -> String {
    "ready".to_string()
}
fn default_label_in_queue() -> String {
    "in-queue".to_string()
}
fn default_label_in_process() -> String {
    "in-process".to_string()
}
fn default_label_in_review() -> String {
    "in-review".to_string()
}
