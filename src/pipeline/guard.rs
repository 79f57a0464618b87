//! Scoped ownership of a task workspace.

use crate::error::Result;
use crate::workspace::{StaleRecovery, WorkspaceHandle, WorkspaceManager};
use tracing::{error, info, warn};

/// RAII guard for a task workspace.
///
/// Armed before the workspace is created so a half-created worktree is reclaimed too.
/// [`release`](Self::release) destroys the workspace and reports the outcome; if the
/// guard is dropped without being released (an early return or a panic unwinding the
/// stack), the workspace is destroyed from `Drop` and failures are only logged. Either
/// way destruction is attempted exactly once.
#[derive(Debug)]
pub struct WorkspaceGuard<'a> {
    manager: &'a WorkspaceManager,
    handle: WorkspaceHandle,
    released: bool,
}

impl<'a> WorkspaceGuard<'a> {
    pub fn new(manager: &'a WorkspaceManager, handle: WorkspaceHandle) -> Self {
        Self {
            manager,
            handle,
            released: false,
        }
    }

    /// Create the workspace, clearing leftovers of earlier runs first.
    pub fn create(&self) -> Result<StaleRecovery> {
        self.manager.create(&self.handle)
    }

    /// Destroy the workspace and return the result.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        let result = self.manager.destroy(&self.handle);
        if result.is_ok() {
            info!(path = %self.handle.path.display(), "workspace reclaimed");
        }
        result
    }
}

impl Drop for WorkspaceGuard<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        warn!(
            path = %self.handle.path.display(),
            panicking = std::thread::panicking(),
            "workspace guard dropped without release; reclaiming"
        );
        if let Err(e) = self.manager.destroy(&self.handle) {
            error!(path = %self.handle.path.display(), error = %e, "failed to reclaim workspace");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::git::run_git;
    use crate::task::TaskDescriptor;
    use crate::test_support::{RepoWithRemote, create_test_repo_with_remote};
    use serde_json::json;
    use tempfile::TempDir;

    fn setup() -> (RepoWithRemote, TempDir, WorkspaceManager, WorkspaceHandle) {
        let repo = create_test_repo_with_remote();
        let temp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.project_path = Some(repo.path().to_path_buf());
        config.worktrees_dir = temp.path().join("worktrees");
        let task = TaskDescriptor::from_value(
            json!({
                "id": "7",
                "title": "t",
                "body": "b",
                "sourceUrl": "https://github.com/acme/game/issues/7",
                "repositoryUrl": "https://github.com/acme/game"
            }),
            &config,
        )
        .unwrap();
        let manager = WorkspaceManager::new(&config);
        let handle = manager.prepare(&task).unwrap();
        (repo, temp, manager, handle)
    }

    fn branch_exists(repo: &RepoWithRemote, branch: &str) -> bool {
        run_git(
            repo.path(),
            &["rev-parse", "--verify", "--quiet", &format!("refs/heads/{}", branch)],
        )
        .is_ok()
    }

    #[test]
    fn test_release_destroys_workspace() {
        let (repo, _temp, manager, handle) = setup();
        let guard = WorkspaceGuard::new(&manager, handle.clone());
        guard.create().unwrap();
        assert!(handle.path.exists());

        guard.release().unwrap();

        assert!(!handle.path.exists());
        assert!(!branch_exists(&repo, &handle.branch_name));
    }

    #[test]
    fn test_drop_destroys_workspace() {
        let (repo, _temp, manager, handle) = setup();
        {
            let guard = WorkspaceGuard::new(&manager, handle.clone());
            guard.create().unwrap();
        }
        assert!(!handle.path.exists());
        assert!(!branch_exists(&repo, &handle.branch_name));
    }

    #[test]
    fn test_drop_during_panic_destroys_workspace() {
        let (repo, _temp, manager, handle) = setup();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let guard = WorkspaceGuard::new(&manager, handle.clone());
            guard.create().unwrap();
            panic!("stage blew up");
        }));

        assert!(result.is_err());
        assert!(!handle.path.exists());
        assert!(!branch_exists(&repo, &handle.branch_name));
    }

    #[test]
    fn test_release_of_never_created_workspace_succeeds() {
        let (_repo, _temp, manager, handle) = setup();
        let guard = WorkspaceGuard::new(&manager, handle);
        guard.release().unwrap();
    }
}
