//! Isolated per-task workspaces.
//!
//! A workspace is a git worktree of the canonical project checkout, on its own branch,
//! rooted at the checkout's current tip. Both its path and its branch are derived from
//! the task's run key (`{project}/task-{id}`), so two tasks never share one and a rerun
//! of the same task finds whatever a crashed earlier run left behind.
//!
//! - [`WorkspaceManager::prepare`] resolves the handle without touching anything.
//! - [`WorkspaceManager::create`] removes leftovers, then adds the worktree.
//! - [`WorkspaceManager::destroy`] removes the worktree and its branch; idempotent.
//!
//! Creation failures are `PipelineError::Git` (exit 3); destruction failures are
//! `PipelineError::Cleanup` (exit 4).

mod branch;
mod worktree;

use branch::{branch_exists, delete_branch};
use worktree::{add_worktree, find_worktrees, prune_worktrees, remove_worktree};

use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::git::{current_branch, get_repo_root, head_sha, list_remotes};
use crate::task::TaskDescriptor;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Identity and location of one task's workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceHandle {
    /// Worktree directory.
    pub path: PathBuf,
    /// Task branch checked out in the worktree.
    pub branch_name: String,
    /// Root of the canonical checkout the worktree belongs to.
    pub base_project_path: PathBuf,
    /// Commit the branch was created at.
    pub base_commit: String,
    /// Branch the review request targets.
    pub base_branch: String,
}

/// What [`WorkspaceManager::create`] had to clear away before creating the workspace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaleRecovery {
    /// Registered worktrees removed (at the task path or on the task branch).
    pub removed_worktrees: Vec<PathBuf>,
    /// An unregistered directory occupied the task path.
    pub removed_directory: bool,
    /// The task branch already existed.
    pub removed_branch: bool,
}

impl StaleRecovery {
    /// True if nothing was left over.
    pub fn is_empty(&self) -> bool {
        self.removed_worktrees.is_empty() && !self.removed_directory && !self.removed_branch
    }
}

/// Creates and destroys task workspaces.
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    worktrees_dir: PathBuf,
    branch_prefix: String,
    remote: String,
    base_branch: Option<String>,
}

impl WorkspaceManager {
    pub fn new(config: &Config) -> Self {
        Self {
            worktrees_dir: config.worktrees_dir.clone(),
            branch_prefix: config.branch_prefix.clone(),
            remote: config.remote.clone(),
            base_branch: config.base_branch.clone(),
        }
    }

    /// Branch name for a task: `{branch_prefix}/{project}/task-{id}`.
    pub fn branch_name(&self, task: &TaskDescriptor) -> String {
        format!("{}/{}", self.branch_prefix, task.run_key())
    }

    /// Worktree directory for a task: `{worktrees_dir}/{project}/task-{id}`.
    pub fn workspace_path(&self, task: &TaskDescriptor) -> Result<PathBuf> {
        let dir = std::path::absolute(&self.worktrees_dir).map_err(|e| {
            PipelineError::Config(format!(
                "invalid worktrees_dir '{}': {}",
                self.worktrees_dir.display(),
                e
            ))
        })?;
        // git reports worktree paths canonicalized
        let dir = dir.canonicalize().unwrap_or(dir);
        Ok(dir.join(task.run_key()))
    }

    /// Resolve the workspace handle for a task.
    ///
    /// Verifies the canonical checkout (exists, is a repository, has the configured remote,
    /// has a commit, has a base branch) but changes nothing on disk.
    pub fn prepare(&self, task: &TaskDescriptor) -> Result<WorkspaceHandle> {
        let repo_root = get_repo_root(&task.project_path)?;

        let remotes = list_remotes(&repo_root)?;
        if !remotes.iter().any(|r| r == &self.remote) {
            return Err(PipelineError::Git(format!(
                "remote '{}' does not exist in '{}'.\n\n\
                 Add it (git remote add {} <url>) or set `remote` in the config.",
                self.remote,
                repo_root.display(),
                self.remote
            )));
        }

        let base_commit = head_sha(&repo_root)?;
        let base_branch = match &self.base_branch {
            Some(branch) => branch.clone(),
            None => {
                let branch = current_branch(&repo_root)?;
                if branch == "HEAD" {
                    return Err(PipelineError::Git(format!(
                        "'{}' has a detached HEAD; set `base_branch` in the config",
                        repo_root.display()
                    )));
                }
                branch
            }
        };

        Ok(WorkspaceHandle {
            path: self.workspace_path(task)?,
            branch_name: self.branch_name(task),
            base_project_path: repo_root,
            base_commit,
            base_branch,
        })
    }

    /// Create the workspace, forcibly removing any leftover with the same identity first.
    pub fn create(&self, handle: &WorkspaceHandle) -> Result<StaleRecovery> {
        let recovery = self.remove_stale(handle)?;
        if !recovery.is_empty() {
            warn!(
                path = %handle.path.display(),
                branch = %handle.branch_name,
                "removed leftover workspace from an earlier run"
            );
        }

        add_worktree(
            &handle.base_project_path,
            &handle.path,
            &handle.branch_name,
            &handle.base_commit,
        )?;
        info!(
            path = %handle.path.display(),
            branch = %handle.branch_name,
            base = %handle.base_commit,
            "workspace created"
        );

        Ok(recovery)
    }

    fn remove_stale(&self, handle: &WorkspaceHandle) -> Result<StaleRecovery> {
        let repo = &handle.base_project_path;
        let mut recovery = StaleRecovery::default();

        for wt in find_worktrees(repo, &handle.path, &handle.branch_name)? {
            if remove_worktree(repo, &wt.path).is_err() {
                remove_dir(&wt.path).map_err(PipelineError::Git)?;
            }
            recovery.removed_worktrees.push(wt.path);
        }

        if handle.path.exists() {
            remove_dir(&handle.path).map_err(PipelineError::Git)?;
            recovery.removed_directory = true;
        }

        prune_worktrees(repo)?;

        if branch_exists(repo, &handle.branch_name)? {
            delete_branch(repo, &handle.branch_name)?;
            recovery.removed_branch = true;
        }

        Ok(recovery)
    }

    /// Remove the workspace directory and delete its branch.
    ///
    /// Safe on a partially created or already removed workspace. Falls back to deleting
    /// the directory and pruning when `git worktree remove` fails.
    pub fn destroy(&self, handle: &WorkspaceHandle) -> Result<()> {
        let repo = &handle.base_project_path;

        if !repo.is_dir() {
            // Nothing left to deregister from; just reclaim the disk.
            if handle.path.exists() {
                remove_dir(&handle.path).map_err(PipelineError::Cleanup)?;
            }
            return Ok(());
        }

        let registered = find_worktrees(repo, &handle.path, &handle.branch_name)
            .map_err(cleanup_error)?;
        for wt in &registered {
            if let Err(e) = remove_worktree(repo, &wt.path) {
                warn!(path = %wt.path.display(), error = %e, "worktree remove failed, deleting directory");
                remove_dir(&wt.path).map_err(PipelineError::Cleanup)?;
            }
        }

        if handle.path.exists() {
            remove_dir(&handle.path).map_err(PipelineError::Cleanup)?;
        }

        prune_worktrees(repo).map_err(cleanup_error)?;

        if branch_exists(repo, &handle.branch_name).map_err(cleanup_error)? {
            delete_branch(repo, &handle.branch_name).map_err(cleanup_error)?;
        }

        debug!(path = %handle.path.display(), branch = %handle.branch_name, "workspace destroyed");
        Ok(())
    }
}

fn remove_dir(path: &Path) -> std::result::Result<(), String> {
    std::fs::remove_dir_all(path)
        .map_err(|e| format!("failed to remove directory '{}': {}", path.display(), e))
}

fn cleanup_error(e: PipelineError) -> PipelineError {
    match e {
        PipelineError::Git(msg) => PipelineError::Cleanup(msg),
        other => other,
    }
}
