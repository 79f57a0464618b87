//! Task descriptor model for perch.
//!
//! A task descriptor is the validated, normalized form of one queued work item.
//! It is produced once by the loader and never mutated afterwards.
//!
//! # Input Format
//!
//! Descriptors arrive as JSON objects. Field names are accepted in camelCase and
//! in the snake_case spelling used by the work-item queue:
//!
//! ```text
//! {
//!   "id": "42",                      // or "issue_id": 42
//!   "title": "Add health system",
//!   "body": "Implement a health component ...",
//!   "complexity": "medium",
//!   "sourceUrl": "https://github.com/acme/game/issues/42",
//!   "repositoryUrl": "https://github.com/acme/game",
//!   "projectId": "game",
//!   "testCommand": "godot --headless -s res://test/run.gd"
//! }
//! ```

use crate::config::Platform;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

mod io;
mod loader;

/// Project id used when the descriptor and config name none.
pub const DEFAULT_PROJECT_ID: &str = "default";

/// Informational task size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    #[default]
    Medium,
    Complex,
}

impl Complexity {
    /// Parse a complexity from a string (case-insensitive).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" => Some(Self::Simple),
            "medium" => Some(Self::Medium),
            "complex" => Some(Self::Complex),
            _ => None,
        }
    }
}

impl std::fmt::Display for Complexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Complexity::Simple => write!(f, "simple"),
            Complexity::Medium => write!(f, "medium"),
            Complexity::Complex => write!(f, "complex"),
        }
    }
}

/// A validated work item driving one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskDescriptor {
    /// Work-item identifier (issue number or key).
    pub id: String,
    pub title: String,
    /// Free-text instructions for the agent.
    pub body: String,
    pub complexity: Complexity,
    /// Link to the originating work item.
    pub source_url: String,
    /// Repository hosting the work item and receiving the review request.
    pub repository_url: String,
    pub project_id: String,
    pub project_name: String,
    pub project_type: String,
    /// Canonical checkout the workspace is derived from.
    pub project_path: PathBuf,
    /// Tracker platform for labels, comments, and the review request.
    pub platform: Platform,
    /// Empty means "skip the lint step".
    pub lint_command: String,
    /// Empty means "skip the test step".
    pub test_command: String,
    /// Empty means "skip the build step".
    pub build_command: String,
}

impl TaskDescriptor {
    /// Stable identity used for workspace, branch, and log names: `{project}/task-{id}`.
    ///
    /// Identifiers never contain `/`, so distinct (project, id) pairs never share a key.
    pub fn run_key(&self) -> String {
        format!("{}/task-{}", self.project_id, self.id)
    }
}
