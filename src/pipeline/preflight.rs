//! Everything that must hold before a workspace is created.

use crate::agent::{AgentInvoker, AgentPlan};
use crate::config::Config;
use crate::context::TaskPaths;
use crate::error::{PipelineError, Result};
use crate::process::find_program;
use crate::task::TaskDescriptor;
use crate::tracker::{CliTracker, repo_slug};
use crate::workspace::{WorkspaceHandle, WorkspaceManager};
use std::path::Path;
use tracing::debug;

/// A task resolved against the configuration, ready to run.
#[derive(Debug)]
pub struct Preflight {
    pub task: TaskDescriptor,
    pub paths: TaskPaths,
    pub handle: WorkspaceHandle,
    pub plan: AgentPlan,
    pub tracker: CliTracker,
}

impl Preflight {
    /// Load the descriptor and verify every prerequisite. No side effects.
    ///
    /// Errors: `Config` for bad input or templates, `Prerequisite` for missing tools,
    /// `Git` when the canonical checkout is unusable.
    pub fn check(config: &Config, descriptor: &Path) -> Result<Self> {
        let task = TaskDescriptor::load(descriptor, config)?;
        Self::for_task(config, task)
    }

    pub fn for_task(config: &Config, task: TaskDescriptor) -> Result<Self> {
        require_program("git", "git")?;

        let repo = repo_slug(&task.repository_url).ok_or_else(|| {
            PipelineError::Config(format!(
                "invalid field: repositoryUrl ('{}' does not name a repository)",
                task.repository_url
            ))
        })?;
        let tracker_program = config.tracker_program(task.platform);

        let handle = WorkspaceManager::new(config).prepare(&task)?;
        let paths = TaskPaths::new(&config.logs_dir, &task);
        let plan = AgentInvoker::new(&config.agent).plan(&task, &handle, &paths)?;

        require_program(plan.program(), "agent.command")?;
        require_program(&tracker_program, "tracker.program")?;

        debug!(task = %task.id, repo = %repo, "preflight passed");
        Ok(Self {
            tracker: CliTracker::new(task.platform, tracker_program, repo),
            task,
            paths,
            handle,
            plan,
        })
    }
}

fn require_program(program: &str, setting: &str) -> Result<()> {
    match find_program(program) {
        Some(path) => {
            debug!(program, path = %path.display(), "found program");
            Ok(())
        }
        None => Err(PipelineError::Prerequisite(format!(
            "'{}' ({}) was not found. Install it or fix the path in the config.",
            program, setting
        ))),
    }
}
