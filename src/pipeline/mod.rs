//! The task execution pipeline.
//!
//! One run takes one task descriptor through:
//!
//! 1. **Preflight**: load the descriptor, resolve the workspace, agent command and
//!    tracker, and check the required tools exist. Nothing is created on failure.
//! 2. **Workspace**: create the task worktree, removing leftovers of earlier runs.
//! 3. **Agent**: label the work item `in-process` and run the agent.
//! 4. **Changes**: fail with `NoOp` if the agent changed nothing.
//! 5. **Validation**: lint (advisory), test, build.
//! 6. **Publish**: commit, push, open the review request, label `in-review`.
//!
//! The workspace is held by a [`WorkspaceGuard`] from step 2 on and reclaimed on every
//! exit path. A failed cleanup is reported separately and never replaces the outcome
//! of the task itself.

mod guard;
mod preflight;
mod state;

pub use guard::WorkspaceGuard;
pub use preflight::Preflight;
pub use state::PipelineState;

use crate::agent::{AgentInvoker, AgentPlan};
use crate::changes::ensure_changes;
use crate::config::Config;
use crate::context::TaskPaths;
use crate::error::{PipelineError, Result};
use crate::events::{self, Event, EventAction};
use crate::exit_codes;
use crate::labels::LabelUpdater;
use crate::process::shutdown_requested;
use crate::publish::{PublishManager, PublishResult};
use crate::task::TaskDescriptor;
use crate::tracker::CliTracker;
use crate::validate::ValidationRunner;
use crate::workspace::{WorkspaceHandle, WorkspaceManager};
use chrono::Utc;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{error, info, instrument, warn};

/// What a run produced.
#[derive(Debug)]
pub struct RunReport {
    /// Task id, when the descriptor could be loaded.
    pub task_id: Option<String>,
    pub state: PipelineState,
    pub outcome: Result<PublishResult>,
    /// Workspace reclamation; `Ok` as well when no workspace was ever created.
    pub cleanup: Result<()>,
    pub log_path: Option<PathBuf>,
}

impl RunReport {
    fn rejected(error: PipelineError) -> Self {
        Self {
            task_id: None,
            state: PipelineState::Failed,
            outcome: Err(error),
            cleanup: Ok(()),
            log_path: None,
        }
    }

    /// Process exit code: a cleanup failure wins over the task outcome.
    pub fn exit_code(&self) -> i32 {
        if let Err(e) = &self.cleanup {
            return e.exit_code();
        }
        match &self.outcome {
            Ok(_) => exit_codes::SUCCESS,
            Err(e) => e.exit_code(),
        }
    }
}

/// Run the pipeline for the task descriptor at `descriptor`.
pub fn run(config: &Config, descriptor: &Path) -> RunReport {
    match Preflight::check(config, descriptor) {
        Ok(preflight) => PipelineContext::new(config, preflight).execute(),
        Err(e) => {
            warn!(descriptor = %descriptor.display(), error = %e, "task rejected");
            RunReport::rejected(e)
        }
    }
}

/// State threaded through the stages of one run.
pub struct PipelineContext<'a> {
    config: &'a Config,
    task: TaskDescriptor,
    paths: TaskPaths,
    handle: WorkspaceHandle,
    plan: AgentPlan,
    tracker: CliTracker,
    state: PipelineState,
}

impl<'a> PipelineContext<'a> {
    pub fn new(config: &'a Config, preflight: Preflight) -> Self {
        Self {
            config,
            task: preflight.task,
            paths: preflight.paths,
            handle: preflight.handle,
            plan: preflight.plan,
            tracker: preflight.tracker,
            state: PipelineState::Pending,
        }
    }

    /// Run every stage, then reclaim the workspace.
    #[instrument(skip_all, fields(task = %self.task.id, project = %self.task.project_id))]
    pub fn execute(mut self) -> RunReport {
        if let Err(e) = self.paths.init(&self.header()) {
            error!(error = %e, "cannot write run log");
            self.advance(PipelineState::Failed);
            return self.report(Err(e), Ok(()));
        }
        info!(log = %self.paths.log_path.display(), "run started");
        self.event(
            EventAction::RunStarted,
            json!({
                "title": self.task.title,
                "branch": self.handle.branch_name,
                "workspace": self.handle.path,
            }),
        );

        let manager = WorkspaceManager::new(self.config);
        let guard = WorkspaceGuard::new(&manager, self.handle.clone());

        let outcome = self.stages(&guard);
        match &outcome {
            Ok(published) => {
                info!(url = %published.review_url, "run succeeded");
                self.note(&format!("published: {}", published.review_url));
            }
            Err(e) => {
                let failed_in = self.state;
                self.advance(PipelineState::Failed);
                error!(kind = e.kind(), state = %failed_in, error = %e, "run failed");
                self.note(&format!("FAILED in {}: {}", failed_in, e));
                self.event(
                    EventAction::Failed,
                    json!({
                        "kind": e.kind(),
                        "state": failed_in,
                        "message": e.to_string(),
                        "exit_code": e.exit_code(),
                    }),
                );
            }
        }

        let cleanup = guard.release();
        match &cleanup {
            Ok(()) => {
                self.note("cleanup: workspace reclaimed");
                self.event(EventAction::CleanupDone, json!({}));
            }
            Err(e) => {
                error!(error = %e, "workspace cleanup failed");
                self.note(&format!("cleanup FAILED: {}", e));
                self.event(EventAction::CleanupFailed, json!({ "message": e.to_string() }));
            }
        }

        self.report(outcome, cleanup)
    }

    fn stages(&mut self, guard: &WorkspaceGuard) -> Result<PublishResult> {
        let recovery = guard.create()?;
        if !recovery.is_empty() {
            self.note("removed leftovers of an earlier run of this task");
            self.event(
                EventAction::StaleWorkspaceRemoved,
                json!({
                    "worktrees": recovery.removed_worktrees,
                    "directory": recovery.removed_directory,
                    "branch": recovery.removed_branch,
                }),
            );
        }
        self.advance(PipelineState::WorkspaceReady);
        self.paths
            .log_line(&format!("workspace ready: {}", self.handle.path.display()))?;
        self.event(
            EventAction::WorkspaceReady,
            json!({ "base_commit": self.handle.base_commit }),
        );

        self.labels().mark_in_process(&self.task, &self.paths);

        check_interrupt(PipelineError::Agent)?;
        let agent = AgentInvoker::new(&self.config.agent).run(&self.plan, &self.paths)?;
        self.advance(PipelineState::AgentDone);
        self.paths.log_line(&format!(
            "agent finished in {}s",
            agent.duration.as_secs()
        ))?;
        self.event(
            EventAction::AgentDone,
            json!({
                "exit_code": agent.exit_code,
                "duration_ms": agent.duration.as_millis() as u64,
                "transcript": agent.transcript_path,
            }),
        );

        ensure_changes(&self.handle)?;
        self.advance(PipelineState::ChangeConfirmed);
        self.event(EventAction::ChangeConfirmed, json!({}));

        let validation = ValidationRunner::new(self.config.validation.timeout_seconds).validate(
            &self.handle,
            &self.task,
            &self.paths,
        )?;
        if let Some(lint) = validation.lint_failure() {
            warn!(error = %lint, "lint failure recorded");
            self.event(EventAction::LintFailed, json!({ "message": lint.to_string() }));
        }
        validation.ensure_passed()?;
        self.advance(PipelineState::Validated);
        let steps: Vec<_> = validation
            .steps
            .iter()
            .map(|s| json!({ "name": s.name, "status": s.status.to_string(), "log": s.log_path }))
            .collect();
        self.event(
            EventAction::Validated,
            json!({ "summary": validation.summary(), "steps": steps }),
        );

        check_interrupt(PipelineError::Publish)?;
        let published = PublishManager::new(&self.tracker, &self.config.remote).publish(
            &self.handle,
            &self.task,
            &self.paths,
        )?;
        self.advance(PipelineState::Published);
        self.event(
            EventAction::Published,
            json!({ "review_url": published.review_url }),
        );

        self.labels().mark_in_review(&self.task, &self.paths);
        Ok(published)
    }

    fn labels(&self) -> LabelUpdater<'_> {
        LabelUpdater::new(&self.tracker, &self.config.tracker.labels)
    }

    fn advance(&mut self, to: PipelineState) {
        debug_assert!(
            self.state.can_transition(to),
            "invalid transition {} -> {}",
            self.state,
            to
        );
        self.state = to;
    }

    fn header(&self) -> String {
        format!(
            "perch run for task #{} ({})\n\
             title:     {}\n\
             project:   {} [{}]\n\
             checkout:  {}\n\
             workspace: {}\n\
             branch:    {}\n\
             started:   {}\n",
            self.task.id,
            self.task.source_url,
            self.task.title,
            self.task.project_id,
            self.task.project_type,
            self.handle.base_project_path.display(),
            self.handle.path.display(),
            self.handle.branch_name,
            Utc::now().to_rfc3339(),
        )
    }

    /// Append to the run log outside the stages, where a write failure must not mask
    /// the outcome.
    fn note(&self, message: &str) {
        if let Err(e) = self.paths.log_line(message) {
            warn!(error = %e, "failed to write run log");
        }
    }

    fn event(&self, action: EventAction, details: serde_json::Value) {
        events::record(
            &self.paths,
            Event::new(action)
                .with_task(&self.task.id)
                .with_details(details),
        );
    }

    fn report(self, outcome: Result<PublishResult>, cleanup: Result<()>) -> RunReport {
        RunReport {
            task_id: Some(self.task.id),
            state: self.state,
            outcome,
            cleanup,
            log_path: Some(self.paths.log_path),
        }
    }
}

/// Stop between stages once a shutdown was requested.
fn check_interrupt(error: fn(String) -> PipelineError) -> Result<()> {
    if shutdown_requested() {
        return Err(error("interrupted by shutdown request".to_string()));
    }
    Ok(())
}
