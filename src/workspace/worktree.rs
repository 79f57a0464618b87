//! Low-level `git worktree` operations.

use crate::error::{PipelineError, Result};
use crate::git::run_git;
use std::path::{Path, PathBuf};

/// A worktree registered with the canonical checkout.
#[derive(Debug, Clone)]
pub struct ExistingWorktree {
    pub path: PathBuf,
    /// Branch the worktree is on (`None` when detached).
    pub branch: Option<String>,
}

/// List all worktrees registered with the repository, the main one included.
pub fn list_worktrees<P: AsRef<Path>>(repo_root: P) -> Result<Vec<ExistingWorktree>> {
    let output = run_git(repo_root, &["worktree", "list", "--porcelain"])?;

    let mut worktrees = Vec::new();
    let mut current_path: Option<PathBuf> = None;
    let mut current_branch: Option<String> = None;

    for line in output.stdout.lines() {
        if let Some(path) = line.strip_prefix("worktree ") {
            if let Some(path) = current_path.take() {
                worktrees.push(ExistingWorktree {
                    path,
                    branch: current_branch.take(),
                });
            }
            current_path = Some(PathBuf::from(path));
        } else if let Some(branch_ref) = line.strip_prefix("branch ") {
            current_branch = branch_ref.strip_prefix("refs/heads/").map(String::from);
        } else if line == "detached" {
            current_branch = None;
        }
    }

    if let Some(path) = current_path {
        worktrees.push(ExistingWorktree {
            path,
            branch: current_branch,
        });
    }

    Ok(worktrees)
}

/// Registered worktrees located at `path` or checked out on `branch`.
pub fn find_worktrees<P: AsRef<Path>>(
    repo_root: P,
    path: &Path,
    branch: &str,
) -> Result<Vec<ExistingWorktree>> {
    let repo_root = repo_root.as_ref();
    Ok(list_worktrees(repo_root)?
        .into_iter()
        .filter(|wt| !paths_equivalent(&wt.path, repo_root))
        .filter(|wt| paths_equivalent(&wt.path, path) || wt.branch.as_deref() == Some(branch))
        .collect())
}

/// Create `branch` at `base_sha` and check it out in a new worktree at `worktree_path`.
pub fn add_worktree<P: AsRef<Path>>(
    repo_root: P,
    worktree_path: &Path,
    branch: &str,
    base_sha: &str,
) -> Result<()> {
    let worktree_str = worktree_path.to_string_lossy();

    if let Some(parent) = worktree_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            PipelineError::Git(format!(
                "failed to create worktrees directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    run_git(
        repo_root,
        &["worktree", "add", "-b", branch, &worktree_str, base_sha],
    )
    .map_err(|e| {
        PipelineError::Git(format!(
            "failed to create worktree at '{}' for branch '{}': {}",
            worktree_str, branch, e
        ))
    })?;

    Ok(())
}

/// Force-remove a worktree, discarding any uncommitted changes in it.
pub fn remove_worktree<P: AsRef<Path>>(repo_root: P, worktree_path: &Path) -> Result<()> {
    let worktree_str = worktree_path.to_string_lossy();
    run_git(repo_root, &["worktree", "remove", "--force", &worktree_str]).map_err(|e| {
        PipelineError::Git(format!(
            "failed to remove worktree '{}': {}",
            worktree_str, e
        ))
    })?;
    Ok(())
}

/// Drop administrative entries for worktrees whose directory is gone.
pub fn prune_worktrees<P: AsRef<Path>>(repo_root: P) -> Result<()> {
    run_git(repo_root, &["worktree", "prune"])?;
    Ok(())
}

/// Check if two paths are equivalent (handling symlinks such as `/tmp` on macOS).
pub(crate) fn paths_equivalent(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a_canon), Ok(b_canon)) => a_canon == b_canon,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::head_sha;
    use crate::test_support::create_test_repo;
    use tempfile::TempDir;

    #[test]
    fn test_list_worktrees() {
        let temp_dir = create_test_repo();
        let path = temp_dir.path();

        let worktrees = list_worktrees(path).unwrap();
        assert_eq!(worktrees.len(), 1);
        assert_eq!(worktrees[0].branch.as_deref(), Some("main"));

        let wt_root = TempDir::new().unwrap();
        let worktree_path = wt_root.path().join("listed");
        let base = head_sha(path).unwrap();
        add_worktree(path, &worktree_path, "perch/listed", &base).unwrap();

        let worktrees = list_worktrees(path).unwrap();
        assert_eq!(worktrees.len(), 2);
        assert!(
            worktrees
                .iter()
                .any(|wt| wt.branch.as_deref() == Some("perch/listed"))
        );
    }

    #[test]
    fn test_find_worktrees_by_path_or_branch() {
        let temp_dir = create_test_repo();
        let path = temp_dir.path();
        let wt_root = TempDir::new().unwrap();
        let worktree_path = wt_root.path().join("found");
        let base = head_sha(path).unwrap();
        add_worktree(path, &worktree_path, "perch/found", &base).unwrap();

        let by_path = find_worktrees(path, &worktree_path, "other").unwrap();
        assert_eq!(by_path.len(), 1);

        let by_branch = find_worktrees(path, &wt_root.path().join("elsewhere"), "perch/found")
            .unwrap();
        assert_eq!(by_branch.len(), 1);

        // The canonical checkout itself is never reported
        let none = find_worktrees(path, path, "main").unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_add_worktree_creates_parent_dirs() {
        let temp_dir = create_test_repo();
        let path = temp_dir.path();
        let wt_root = TempDir::new().unwrap();
        let worktree_path = wt_root.path().join("a").join("b").join("nested");
        let base = head_sha(path).unwrap();

        add_worktree(path, &worktree_path, "perch/nested", &base).unwrap();
        assert!(worktree_path.join("README.md").exists());
    }

    #[test]
    fn test_remove_worktree_with_dirty_tree() {
        let temp_dir = create_test_repo();
        let path = temp_dir.path();
        let wt_root = TempDir::new().unwrap();
        let worktree_path = wt_root.path().join("dirty");
        let base = head_sha(path).unwrap();
        add_worktree(path, &worktree_path, "perch/dirty", &base).unwrap();
        std::fs::write(worktree_path.join("scratch.txt"), "x\n").unwrap();

        remove_worktree(path, &worktree_path).unwrap();
        assert!(!worktree_path.exists());
    }

    #[test]
    fn test_prune_after_manual_delete() {
        let temp_dir = create_test_repo();
        let path = temp_dir.path();
        let wt_root = TempDir::new().unwrap();
        let worktree_path = wt_root.path().join("gone");
        let base = head_sha(path).unwrap();
        add_worktree(path, &worktree_path, "perch/gone", &base).unwrap();

        std::fs::remove_dir_all(&worktree_path).unwrap();
        prune_worktrees(path).unwrap();
        assert_eq!(list_worktrees(path).unwrap().len(), 1);
    }
}
