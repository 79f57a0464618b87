//! [`Tracker`] backed by the `gh` and `glab` command-line tools.

use super::{ReviewRequest, Tracker, TrackerError};
use crate::config::Platform;
use regex::Regex;
use std::process::Command;
use std::sync::LazyLock;
use tracing::debug;

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s"'<>]+"#).expect("URL regex is valid"));

/// Platform CLI bound to one repository.
#[derive(Debug, Clone)]
pub struct CliTracker {
    platform: Platform,
    program: String,
    repo: String,
}

impl CliTracker {
    pub fn new(platform: Platform, program: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            platform,
            program: program.into(),
            repo: repo.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn edit_label(&self, issue: &str, label: &str, add: bool) -> Result<(), TrackerError> {
        let (verb, flag) = match (self.platform, add) {
            (Platform::Github, true) => ("edit", "--add-label"),
            (Platform::Github, false) => ("edit", "--remove-label"),
            (Platform::Gitlab, true) => ("update", "--label"),
            (Platform::Gitlab, false) => ("update", "--unlabel"),
        };
        self.run(&["issue", verb, issue, flag, label]).map(|_| ())
    }

    fn repo_flag(&self) -> &'static str {
        match self.platform {
            Platform::Github => "--repo",
            Platform::Gitlab => "-R",
        }
    }

    /// Run the CLI and return trimmed stdout.
    fn run(&self, args: &[&str]) -> Result<String, TrackerError> {
        let command = format!(
            "{} {}",
            self.program,
            args.iter().take(2).copied().collect::<Vec<_>>().join(" ")
        );
        debug!(command = %command, repo = %self.repo, "running tracker CLI");

        let output = Command::new(&self.program)
            .args(args)
            .args([self.repo_flag(), self.repo.as_str()])
            .output()
            .map_err(|source| TrackerError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if output.status.success() {
            Ok(stdout)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            Err(TrackerError::Failed {
                command,
                code: output.status.code().unwrap_or(-1),
                stderr: if stderr.is_empty() { stdout } else { stderr },
            })
        }
    }
}

impl Tracker for CliTracker {
    fn add_label(&self, issue: &str, label: &str) -> Result<(), TrackerError> {
        self.edit_label(issue, label, true)
    }

    fn remove_label(&self, issue: &str, label: &str) -> Result<(), TrackerError> {
        self.edit_label(issue, label, false)
    }

    fn comment(&self, issue: &str, body: &str) -> Result<(), TrackerError> {
        let args = match self.platform {
            Platform::Github => ["issue", "comment", issue, "--body", body],
            Platform::Gitlab => ["issue", "note", issue, "-m", body],
        };
        self.run(&args).map(|_| ())
    }

    fn create_review_request(&self, request: &ReviewRequest) -> Result<String, TrackerError> {
        let output = match self.platform {
            Platform::Github => self.run(&[
                "pr",
                "create",
                "--head",
                &request.head,
                "--base",
                &request.base,
                "--title",
                &request.title,
                "--body",
                &request.body,
            ])?,
            Platform::Gitlab => self.run(&[
                "mr",
                "create",
                "--source-branch",
                &request.head,
                "--target-branch",
                &request.base,
                "--title",
                &request.title,
                "--description",
                &request.body,
                "--yes",
            ])?,
        };

        extract_url(&output).ok_or_else(|| TrackerError::NoUrl {
            command: format!("{} review request create", self.program),
            output,
        })
    }

    fn find_review_request_url(&self, branch: &str) -> Result<Option<String>, TrackerError> {
        let output = match self.platform {
            Platform::Github => self.run(&["pr", "view", branch, "--json", "url", "-q", ".url"]),
            Platform::Gitlab => self.run(&["mr", "view", branch, "--output", "json"]),
        };

        match output {
            Ok(output) => Ok(match self.platform {
                Platform::Github => extract_url(&output),
                Platform::Gitlab => web_url_from_json(&output),
            }),
            // Both CLIs exit non-zero when no request exists for the branch
            Err(TrackerError::Failed { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Last URL printed by a CLI (progress lines may precede it).
fn extract_url(output: &str) -> Option<String> {
    URL_RE
        .find_iter(output)
        .last()
        .map(|m| m.as_str().trim_end_matches(['.', ',', ')']).to_string())
}

fn web_url_from_json(output: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(output).ok()?;
    value
        .get("web_url")
        .and_then(|v| v.as_str())
        .map(String::from)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::test_support::write_script;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// Fake CLI: records `[arg]` per argument on one line, then runs `tail`.
    fn fake_cli(dir: &Path, tail: &str) -> (PathBuf, PathBuf) {
        let log = dir.join("calls.log");
        let body = format!(
            "for a in \"$@\"; do printf '[%s]' \"$a\" >> '{}'; done\necho >> '{}'\n{}",
            log.display(),
            log.display(),
            tail
        );
        (write_script(dir, "cli", &body), log)
    }

    fn calls(log: &Path) -> Vec<String> {
        std::fs::read_to_string(log)
            .unwrap_or_default()
            .lines()
            .map(String::from)
            .collect()
    }

    fn request() -> ReviewRequest {
        ReviewRequest {
            head: "perch/game/task-42".to_string(),
            base: "main".to_string(),
            title: "Task #42: Add health system".to_string(),
            body: "Body with\nnewlines".to_string(),
        }
    }

    #[test]
    fn test_github_labels() {
        let temp = TempDir::new().unwrap();
        let (program, log) = fake_cli(temp.path(), "");
        let tracker = CliTracker::new(Platform::Github, program.to_string_lossy(), "acme/game");

        tracker.remove_label("42", "ready").unwrap();
        tracker.add_label("42", "in-process").unwrap();

        assert_eq!(
            calls(&log),
            vec![
                "[issue][edit][42][--remove-label][ready][--repo][acme/game]",
                "[issue][edit][42][--add-label][in-process][--repo][acme/game]",
            ]
        );
    }

    #[test]
    fn test_gitlab_labels_and_comment() {
        let temp = TempDir::new().unwrap();
        let (program, log) = fake_cli(temp.path(), "");
        let tracker = CliTracker::new(Platform::Gitlab, program.to_string_lossy(), "group/proj");

        tracker.remove_label("7", "in-process").unwrap();
        tracker.add_label("7", "in-review").unwrap();
        tracker.comment("7", "Review: https://x").unwrap();

        assert_eq!(
            calls(&log),
            vec![
                "[issue][update][7][--unlabel][in-process][-R][group/proj]",
                "[issue][update][7][--label][in-review][-R][group/proj]",
                "[issue][note][7][-m][Review: https://x][-R][group/proj]",
            ]
        );
    }

    #[test]
    fn test_github_create_review_request_returns_url() {
        let temp = TempDir::new().unwrap();
        let (program, log) = fake_cli(
            temp.path(),
            "echo 'Creating pull request for perch/game/task-42 into main'\n\
             echo 'https://github.com/acme/game/pull/9'",
        );
        let tracker = CliTracker::new(Platform::Github, program.to_string_lossy(), "acme/game");

        let url = tracker.create_review_request(&request()).unwrap();
        assert_eq!(url, "https://github.com/acme/game/pull/9");
        let call = &calls(&log)[0];
        assert!(call.starts_with("[pr][create][--head][perch/game/task-42][--base][main]"));
        assert!(call.contains("[--title][Task #42: Add health system]"));
    }

    #[test]
    fn test_gitlab_create_review_request() {
        let temp = TempDir::new().unwrap();
        let (program, log) = fake_cli(
            temp.path(),
            "echo '!3 Task #42 (perch/game/task-42)'\necho ' https://gitlab.com/group/proj/-/merge_requests/3'",
        );
        let tracker = CliTracker::new(Platform::Gitlab, program.to_string_lossy(), "group/proj");

        let url = tracker.create_review_request(&request()).unwrap();
        assert_eq!(url, "https://gitlab.com/group/proj/-/merge_requests/3");
        assert!(calls(&log)[0].contains("[--source-branch][perch/game/task-42][--target-branch][main]"));
        assert!(calls(&log)[0].contains("[--yes]"));
    }

    #[test]
    fn test_create_review_request_failure() {
        let temp = TempDir::new().unwrap();
        let (program, _log) = fake_cli(temp.path(), "echo 'HTTP 422: Validation Failed' >&2\nexit 1");
        let tracker = CliTracker::new(Platform::Github, program.to_string_lossy(), "acme/game");

        let err = tracker.create_review_request(&request()).unwrap_err();
        assert!(matches!(err, TrackerError::Failed { code: 1, .. }));
        assert!(err.to_string().contains("Validation Failed"));
    }

    #[test]
    fn test_create_review_request_without_url() {
        let temp = TempDir::new().unwrap();
        let (program, _log) = fake_cli(temp.path(), "echo done");
        let tracker = CliTracker::new(Platform::Github, program.to_string_lossy(), "acme/game");

        let err = tracker.create_review_request(&request()).unwrap_err();
        assert!(matches!(err, TrackerError::NoUrl { .. }));
    }

    #[test]
    fn test_find_review_request_url() {
        let temp = TempDir::new().unwrap();
        let (program, log) = fake_cli(temp.path(), "echo 'https://github.com/acme/game/pull/9'");
        let tracker = CliTracker::new(Platform::Github, program.to_string_lossy(), "acme/game");

        let url = tracker.find_review_request_url("perch/game/task-42").unwrap();
        assert_eq!(url.as_deref(), Some("https://github.com/acme/game/pull/9"));
        assert!(calls(&log)[0].starts_with("[pr][view][perch/game/task-42][--json][url]"));
    }

    #[test]
    fn test_find_review_request_url_gitlab_json() {
        let temp = TempDir::new().unwrap();
        let (program, _log) = fake_cli(
            temp.path(),
            "echo '{\"iid\": 3, \"web_url\": \"https://gitlab.com/group/proj/-/merge_requests/3\"}'",
        );
        let tracker = CliTracker::new(Platform::Gitlab, program.to_string_lossy(), "group/proj");

        let url = tracker.find_review_request_url("perch/game/task-42").unwrap();
        assert_eq!(
            url.as_deref(),
            Some("https://gitlab.com/group/proj/-/merge_requests/3")
        );
    }

    #[test]
    fn test_find_review_request_url_none() {
        let temp = TempDir::new().unwrap();
        let (program, _log) = fake_cli(temp.path(), "echo 'no pull requests found' >&2\nexit 1");
        let tracker = CliTracker::new(Platform::Github, program.to_string_lossy(), "acme/game");

        assert_eq!(tracker.find_review_request_url("b").unwrap(), None);
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let tracker = CliTracker::new(Platform::Github, "/no/such/gh", "acme/game");
        let err = tracker.comment("1", "hi").unwrap_err();
        assert!(matches!(err, TrackerError::Spawn { .. }));
    }

    #[test]
    fn test_extract_url() {
        assert_eq!(
            extract_url("see https://a.example/x/1.\nthen https://b.example/y/2").as_deref(),
            Some("https://b.example/y/2")
        );
        assert_eq!(extract_url("nothing here"), None);
    }
}
