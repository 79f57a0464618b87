//! Branch operations on the canonical checkout.

use crate::error::{PipelineError, Result};
use crate::git::run_git;
use std::path::Path;

/// Check if a branch exists locally.
pub fn branch_exists<P: AsRef<Path>>(repo_root: P, branch: &str) -> Result<bool> {
    let output = run_git(
        repo_root,
        &["rev-parse", "--verify", "--quiet", &format!("refs/heads/{}", branch)],
    );
    Ok(output.is_ok())
}

/// Force-delete a branch (`git branch -D`).
///
/// Task branches are never merged locally, so a safe delete would always refuse.
pub fn delete_branch<P: AsRef<Path>>(repo_root: P, branch: &str) -> Result<()> {
    run_git(repo_root, &["branch", "-D", branch]).map_err(|e| {
        PipelineError::Git(format!("failed to delete branch '{}': {}", branch, e))
    })?;
    Ok(())
}
