//! Git command runner for perch.
//!
//! Provides a safe wrapper around git commands with captured stdout/stderr
//! and structured error handling. All git operations should go through this module.

use crate::error::{PipelineError, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::debug;

/// Result of a successful git command execution.
#[derive(Debug, Clone)]
pub struct GitOutput {
    /// Standard output from the command (trimmed).
    pub stdout: String,
    /// Standard error from the command (trimmed).
    pub stderr: String,
}

impl GitOutput {
    fn from_output(output: &Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }

    /// Returns true if stdout is empty.
    pub fn is_empty(&self) -> bool {
        self.stdout.is_empty()
    }

    /// Returns stdout lines as a vector.
    pub fn lines(&self) -> Vec<&str> {
        if self.stdout.is_empty() {
            Vec::new()
        } else {
            self.stdout.lines().collect()
        }
    }
}

/// Run a git command with the specified working directory.
///
/// # Returns
///
/// * `Ok(GitOutput)` - On successful execution (exit code 0)
/// * `Err(PipelineError::Git)` - On spawn failure or non-zero exit code
pub fn run_git<P: AsRef<Path>>(cwd: P, args: &[&str]) -> Result<GitOutput> {
    let cwd = cwd.as_ref();
    debug!(cwd = %cwd.display(), args = ?args, "running git");

    let output = Command::new("git")
        .current_dir(cwd)
        .args(args)
        .output()
        .map_err(|e| {
            PipelineError::Git(format!(
                "failed to execute git {}: {}",
                args.first().unwrap_or(&""),
                e
            ))
        })?;

    let git_output = GitOutput::from_output(&output);

    if output.status.success() {
        Ok(git_output)
    } else {
        let exit_code = output.status.code().unwrap_or(-1);
        let error_msg = if git_output.stderr.is_empty() {
            git_output.stdout.clone()
        } else {
            git_output.stderr.clone()
        };

        Err(PipelineError::Git(format!(
            "git {} failed (exit code {}): {}",
            args.first().unwrap_or(&""),
            exit_code,
            error_msg
        )))
    }
}

/// Get the repository root directory using `git rev-parse --show-toplevel`.
///
/// Fails with `PipelineError::Git` when `cwd` does not exist or is not under version control.
pub fn get_repo_root<P: AsRef<Path>>(cwd: P) -> Result<PathBuf> {
    let cwd = cwd.as_ref();
    if !cwd.is_dir() {
        return Err(PipelineError::Git(format!(
            "project path '{}' does not exist or is not a directory",
            cwd.display()
        )));
    }

    let output = run_git(cwd, &["rev-parse", "--show-toplevel"]).map_err(|_| {
        PipelineError::Git(format!(
            "'{}' is not inside a git repository",
            cwd.display()
        ))
    })?;
    Ok(PathBuf::from(&output.stdout))
}

/// Full SHA of `HEAD` in the given checkout.
pub fn head_sha<P: AsRef<Path>>(cwd: P) -> Result<String> {
    let output = run_git(cwd, &["rev-parse", "HEAD"]).map_err(|e| {
        PipelineError::Git(format!(
            "failed to resolve HEAD (does the repository have a commit?): {}",
            e
        ))
    })?;
    Ok(output.stdout)
}

/// Name of the branch checked out in `cwd`, or `HEAD` when detached.
pub fn current_branch<P: AsRef<Path>>(cwd: P) -> Result<String> {
    let output = run_git(cwd, &["rev-parse", "--abbrev-ref", "HEAD"])?;
    Ok(output.stdout)
}

/// Names of the configured remotes.
pub fn list_remotes<P: AsRef<Path>>(cwd: P) -> Result<Vec<String>> {
    let output = run_git(cwd, &["remote"])?;
    Ok(output.lines().into_iter().map(String::from).collect())
}

/// Check for staged, unstaged, or untracked changes in a working tree.
pub fn has_uncommitted_changes<P: AsRef<Path>>(cwd: P) -> Result<bool> {
    let output = run_git(cwd, &["status", "--porcelain", "--untracked-files=all"])?;
    Ok(!output.is_empty())
}

/// Count commits reachable from `HEAD` but not from `base_sha`.
pub fn count_commits_since<P: AsRef<Path>>(cwd: P, base_sha: &str) -> Result<u32> {
    let range = format!("{}..HEAD", base_sha);
    let output = run_git(cwd, &["rev-list", "--count", &range])?;

    output.stdout.trim().parse::<u32>().map_err(|e| {
        PipelineError::Git(format!(
            "failed to parse commit count '{}': {}",
            output.stdout.trim(),
            e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::create_test_repo;
    use tempfile::TempDir;

    #[test]
    fn test_run_git_captures_stdout() {
        let temp_dir = create_test_repo();
        let output = run_git(temp_dir.path(), &["rev-parse", "--show-toplevel"]).unwrap();
        assert!(!output.stdout.is_empty());
    }

    #[test]
    fn test_run_git_failure_returns_git_error() {
        let temp_dir = create_test_repo();
        let result = run_git(temp_dir.path(), &["checkout", "nonexistent-branch"]);
        let err = result.unwrap_err();
        assert!(matches!(err, PipelineError::Git(_)));
        assert!(err.to_string().contains("git checkout failed"));
    }

    #[test]
    fn test_get_repo_root_from_subdirectory() {
        let temp_dir = create_test_repo();
        let subdir = temp_dir.path().join("subdir").join("nested");
        std::fs::create_dir_all(&subdir).unwrap();

        let root = get_repo_root(&subdir).unwrap();
        let expected = temp_dir.path().canonicalize().unwrap();
        assert_eq!(root.canonicalize().unwrap(), expected);
    }

    #[test]
    fn test_get_repo_root_outside_repo_is_git_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = get_repo_root(temp_dir.path()).unwrap_err();
        assert!(matches!(err, PipelineError::Git(_)));
        assert!(err.to_string().contains("not inside a git repository"));
    }

    #[test]
    fn test_get_repo_root_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let err = get_repo_root(temp_dir.path().join("gone")).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_has_uncommitted_changes_sees_untracked_files() {
        let temp_dir = create_test_repo();
        assert!(!has_uncommitted_changes(temp_dir.path()).unwrap());

        std::fs::write(temp_dir.path().join("new.txt"), "new\n").unwrap();
        assert!(has_uncommitted_changes(temp_dir.path()).unwrap());
    }

    #[test]
    fn test_count_commits_since() {
        let temp_dir = create_test_repo();
        let path = temp_dir.path();
        let base = head_sha(path).unwrap();
        assert_eq!(count_commits_since(path, &base).unwrap(), 0);

        std::fs::write(path.join("a.txt"), "a\n").unwrap();
        run_git(path, &["add", "."]).unwrap();
        run_git(path, &["commit", "-m", "add a"]).unwrap();
        assert_eq!(count_commits_since(path, &base).unwrap(), 1);
    }

    #[test]
    fn test_current_branch_and_remotes() {
        let temp_dir = create_test_repo();
        assert_eq!(current_branch(temp_dir.path()).unwrap(), "main");
        assert!(list_remotes(temp_dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_git_output_lines() {
        let output = GitOutput {
            stdout: "line1\nline2\nline3".to_string(),
            stderr: String::new(),
        };
        assert_eq!(output.lines(), vec!["line1", "line2", "line3"]);

        let empty = GitOutput {
            stdout: String::new(),
            stderr: String::new(),
        };
        assert!(empty.lines().is_empty());
        assert!(empty.is_empty());
    }
}
