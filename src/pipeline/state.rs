//! Run state machine.

use serde::Serialize;
use std::fmt;

/// Progress of one pipeline run.
///
/// ```text
/// Pending → WorkspaceReady → AgentDone → ChangeConfirmed → Validated → Published
///    └──────────┴──────────────┴─────────────┴──────────────┴──→ Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    #[default]
    Pending,
    WorkspaceReady,
    AgentDone,
    ChangeConfirmed,
    Validated,
    Published,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Published | PipelineState::Failed)
    }

    /// The state a successful stage leads to, or `None` from a terminal state.
    pub fn next(self) -> Option<Self> {
        match self {
            PipelineState::Pending => Some(PipelineState::WorkspaceReady),
            PipelineState::WorkspaceReady => Some(PipelineState::AgentDone),
            PipelineState::AgentDone => Some(PipelineState::ChangeConfirmed),
            PipelineState::ChangeConfirmed => Some(PipelineState::Validated),
            PipelineState::Validated => Some(PipelineState::Published),
            PipelineState::Published | PipelineState::Failed => None,
        }
    }

    pub fn can_transition(self, to: Self) -> bool {
        if to == PipelineState::Failed {
            return !self.is_terminal();
        }
        self.next() == Some(to)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineState::Pending => "PENDING",
            PipelineState::WorkspaceReady => "WORKSPACE_READY",
            PipelineState::AgentDone => "AGENT_DONE",
            PipelineState::ChangeConfirmed => "CHANGE_CONFIRMED",
            PipelineState::Validated => "VALIDATED",
            PipelineState::Published => "PUBLISHED",
            PipelineState::Failed => "FAILED",
        };
        f.write_str(s)
    }
}
