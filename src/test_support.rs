use crate::tracker::{ReviewRequest, Tracker, TrackerError};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// A canonical checkout plus a bare repository registered as its `origin`.
pub(crate) struct RepoWithRemote {
    pub(crate) repo: TempDir,
    pub(crate) remote: TempDir,
}

impl RepoWithRemote {
    pub(crate) fn path(&self) -> &Path {
        self.repo.path()
    }

    pub(crate) fn remote_path(&self) -> &Path {
        self.remote.path()
    }

    /// True if `branch` exists in the bare remote.
    pub(crate) fn remote_has_branch(&self, branch: &str) -> bool {
        Command::new("git")
            .current_dir(self.remote.path())
            .args(["rev-parse", "--verify", &format!("refs/heads/{}", branch)])
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

pub(crate) fn create_test_repo() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    init_repo(temp_dir.path());
    temp_dir
}

pub(crate) fn create_test_repo_with_remote() -> RepoWithRemote {
    let repo = create_test_repo();
    let remote = TempDir::new().unwrap();

    git(remote.path(), &["init", "--bare"]);
    let remote_str = remote.path().to_string_lossy().to_string();
    git(repo.path(), &["remote", "add", "origin", &remote_str]);
    git(repo.path(), &["push", "origin", "main"]);

    RepoWithRemote { repo, remote }
}

/// Write an executable shell script and return its path.
#[cfg(unix)]
pub(crate) fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

fn init_repo(path: &Path) {
    git(path, &["init"]);
    // Ensure the repo uses a deterministic default branch name across environments.
    git(path, &["symbolic-ref", "HEAD", "refs/heads/main"]);

    git(path, &["config", "user.email", "test@example.com"]);
    git(path, &["config", "user.name", "Test User"]);

    std::fs::write(path.join("README.md"), "# Test\n").unwrap();
    git(path, &["add", "."]);
    git(path, &["commit", "-m", "Initial commit"]);
}

pub(crate) fn git(repo_dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .current_dir(repo_dir)
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to execute git {}: {}", args.join(" "), e));

    if !output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!(
            "git {} failed (exit code {:?})\nstdout:\n{}\nstderr:\n{}",
            args.join(" "),
            output.status.code(),
            stdout,
            stderr
        );
    }
}

/// In-memory [`Tracker`] recording every call.
#[derive(Default)]
pub(crate) struct FakeTracker {
    pub(crate) calls: RefCell<Vec<String>>,
    /// Every label call fails.
    pub(crate) fail_labels: bool,
    /// Only label removals fail.
    pub(crate) fail_remove: bool,
    pub(crate) fail_create: bool,
    pub(crate) fail_comment: bool,
    pub(crate) existing_url: Option<String>,
}

impl FakeTracker {
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn failed(command: &str) -> TrackerError {
        TrackerError::Failed {
            command: command.to_string(),
            code: 1,
            stderr: "boom".to_string(),
        }
    }
}

impl Tracker for FakeTracker {
    fn add_label(&self, issue: &str, label: &str) -> Result<(), TrackerError> {
        self.calls
            .borrow_mut()
            .push(format!("label {} +{}", issue, label));
        if self.fail_labels {
            return Err(Self::failed("issue edit"));
        }
        Ok(())
    }

    fn remove_label(&self, issue: &str, label: &str) -> Result<(), TrackerError> {
        self.calls
            .borrow_mut()
            .push(format!("label {} -{}", issue, label));
        if self.fail_labels || self.fail_remove {
            return Err(Self::failed("issue edit"));
        }
        Ok(())
    }

    fn comment(&self, issue: &str, body: &str) -> Result<(), TrackerError> {
        self.calls
            .borrow_mut()
            .push(format!("comment {} {}", issue, body));
        if self.fail_comment {
            return Err(Self::failed("issue comment"));
        }
        Ok(())
    }

    fn create_review_request(&self, request: &ReviewRequest) -> Result<String, TrackerError> {
        self.calls
            .borrow_mut()
            .push(format!("create {} -> {}", request.head, request.base));
        if self.fail_create {
            return Err(Self::failed("pr create"));
        }
        Ok("https://github.com/acme/game/pull/9".to_string())
    }

    fn find_review_request_url(&self, branch: &str) -> Result<Option<String>, TrackerError> {
        self.calls.borrow_mut().push(format!("find {}", branch));
        Ok(self.existing_url.clone())
    }
}
