//! Change detection after the agent has run.

use crate::error::{PipelineError, Result};
use crate::git::{count_commits_since, has_uncommitted_changes};
use crate::workspace::WorkspaceHandle;
use tracing::debug;

/// True if the workspace differs from its base commit: staged, unstaged, or untracked
/// modifications, or commits made on the branch despite the prompt asking otherwise.
pub fn has_changes(handle: &WorkspaceHandle) -> Result<bool> {
    let dirty = has_uncommitted_changes(&handle.path)?;
    let commits = count_commits_since(&handle.path, &handle.base_commit)?;
    debug!(dirty, commits, "inspected workspace for changes");
    Ok(dirty || commits > 0)
}

/// Fail with `PipelineError::NoOp` when the agent left the workspace untouched.
pub fn ensure_changes(handle: &WorkspaceHandle) -> Result<()> {
    if has_changes(handle)? {
        Ok(())
    } else {
        Err(PipelineError::NoOp(format!(
            "the agent made no changes in '{}'",
            handle.path.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::{head_sha, run_git};
    use crate::test_support::create_test_repo;
    use std::path::Path;

    fn handle(path: &Path) -> WorkspaceHandle {
        WorkspaceHandle {
            path: path.to_path_buf(),
            branch_name: "main".to_string(),
            base_project_path: path.to_path_buf(),
            base_commit: head_sha(path).unwrap(),
            base_branch: "main".to_string(),
        }
    }

    #[test]
    fn test_clean_tree_is_noop() {
        let repo = create_test_repo();
        let handle = handle(repo.path());

        assert!(!has_changes(&handle).unwrap());
        let err = ensure_changes(&handle).unwrap_err();
        assert!(matches!(err, PipelineError::NoOp(_)));
        assert_eq!(err.exit_code(), crate::exit_codes::TASK_FAILURE);
    }

    #[test]
    fn test_untracked_file_is_change() {
        let repo = create_test_repo();
        let handle = handle(repo.path());
        std::fs::create_dir_all(repo.path().join("scenes")).unwrap();
        std::fs::write(repo.path().join("scenes").join("health.tscn"), "x").unwrap();

        assert!(has_changes(&handle).unwrap());
        ensure_changes(&handle).unwrap();
    }

    #[test]
    fn test_modified_and_staged_files_are_changes() {
        let repo = create_test_repo();
        let handle = handle(repo.path());

        std::fs::write(repo.path().join("README.md"), "# Changed\n").unwrap();
        assert!(has_changes(&handle).unwrap());

        run_git(repo.path(), &["add", "README.md"]).unwrap();
        assert!(has_changes(&handle).unwrap());
    }

    #[test]
    fn test_deleted_file_is_change() {
        let repo = create_test_repo();
        let handle = handle(repo.path());
        std::fs::remove_file(repo.path().join("README.md")).unwrap();
        assert!(has_changes(&handle).unwrap());
    }

    #[test]
    fn test_agent_commit_is_change() {
        let repo = create_test_repo();
        let handle = handle(repo.path());

        std::fs::write(repo.path().join("a.txt"), "a\n").unwrap();
        run_git(repo.path(), &["add", "."]).unwrap();
        run_git(repo.path(), &["commit", "-m", "agent committed"]).unwrap();

        assert!(has_changes(&handle).unwrap());
    }
}
