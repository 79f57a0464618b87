//! Run event log.
//!
//! Each run appends NDJSON records (one JSON object per line) to
//! `<logs_dir>/<project>/task-<id>/events.ndjson`, giving a machine-readable trace of
//! the state transitions next to the human-readable run log.
//!
//! # Event Format
//!
//! - `ts`: RFC3339 timestamp
//! - `action`: what happened (`run_started`, `workspace_ready`, `failed`, ...)
//! - `actor`: `user@HOST` of the worker
//! - `task`: task id
//! - `details`: action-specific object

use crate::context::TaskPaths;
use crate::error::{PipelineError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use tracing::warn;

/// Actions that can be logged as events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    RunStarted,
    /// Leftover worktree or branch of an earlier run was force-removed.
    StaleWorkspaceRemoved,
    WorkspaceReady,
    AgentDone,
    ChangeConfirmed,
    /// Lint failed; recorded only.
    LintFailed,
    Validated,
    Published,
    /// Best-effort label transition did not go through.
    LabelUpdateFailed,
    /// A fatal error ended the run.
    Failed,
    CleanupDone,
    CleanupFailed,
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EventAction::RunStarted => "run_started",
            EventAction::StaleWorkspaceRemoved => "stale_workspace_removed",
            EventAction::WorkspaceReady => "workspace_ready",
            EventAction::AgentDone => "agent_done",
            EventAction::ChangeConfirmed => "change_confirmed",
            EventAction::LintFailed => "lint_failed",
            EventAction::Validated => "validated",
            EventAction::Published => "published",
            EventAction::LabelUpdateFailed => "label_update_failed",
            EventAction::Failed => "failed",
            EventAction::CleanupDone => "cleanup_done",
            EventAction::CleanupFailed => "cleanup_failed",
        };
        write!(f, "{}", name)
    }
}

/// An event record for the run log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// RFC3339 timestamp when the event occurred.
    pub ts: DateTime<Utc>,

    pub action: EventAction,

    /// The worker that performed the action (e.g., `user@HOST`).
    pub actor: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,

    /// Freeform details object with action-specific information.
    pub details: Value,
}

impl Event {
    /// Create a new event stamped with the current time and actor.
    pub fn new(action: EventAction) -> Self {
        Self {
            ts: Utc::now(),
            action,
            actor: get_actor_string(),
            task: None,
            details: Value::Object(serde_json::Map::new()),
        }
    }

    pub fn with_task(mut self, task_id: impl Into<String>) -> Self {
        self.task = Some(task_id.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Serialize the event to a single-line JSON string.
    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| PipelineError::Config(format!("failed to serialize event to JSON: {}", e)))
    }
}

/// Get the actor string for event metadata.
fn get_actor_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

/// Append an event to the task's events file, creating it if needed.
pub fn append_event(paths: &TaskPaths, event: &Event) -> Result<()> {
    let events_file = paths.events_file();
    let json_line = event.to_ndjson_line()?;

    if !paths.task_dir.exists() {
        fs::create_dir_all(&paths.task_dir).map_err(|e| {
            PipelineError::Config(format!(
                "failed to create events directory '{}': {}",
                paths.task_dir.display(),
                e
            ))
        })?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&events_file)
        .map_err(|e| {
            PipelineError::Config(format!(
                "failed to open events file '{}': {}",
                events_file.display(),
                e
            ))
        })?;

    writeln!(file, "{}", json_line).map_err(|e| {
        PipelineError::Config(format!(
            "failed to write event to '{}': {}",
            events_file.display(),
            e
        ))
    })?;

    Ok(())
}

/// Append an event, logging instead of failing when the write does not go through.
pub fn record(paths: &TaskPaths, event: Event) {
    if let Err(e) = append_event(paths, &event) {
        warn!(action = %event.action, error = %e, "failed to record run event");
    }
}
