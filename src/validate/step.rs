//! A single validation step: one shell command run in the workspace.

use crate::process::{ProcessOutcome, run_logged};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

/// Maximum number of output lines quoted in a failure message.
pub const FAILURE_TAIL_MAX_LINES: usize = 50;

/// Maximum characters quoted in a failure message.
pub const FAILURE_TAIL_MAX_CHARS: usize = 4096;

/// Status of a validation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationStepStatus {
    Pass,
    Fail,
    Skip,
}

impl std::fmt::Display for ValidationStepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationStepStatus::Pass => write!(f, "pass"),
            ValidationStepStatus::Fail => write!(f, "fail"),
            ValidationStepStatus::Skip => write!(f, "skip"),
        }
    }
}

/// Result of a single validation step.
#[derive(Debug, Clone)]
pub struct ValidationStepResult {
    pub name: String,
    pub status: ValidationStepStatus,
    pub message: Option<String>,
    /// Step output, when the command was started.
    pub log_path: Option<PathBuf>,
}

impl ValidationStepResult {
    pub fn pass(name: impl Into<String>, log_path: PathBuf) -> Self {
        Self {
            name: name.into(),
            status: ValidationStepStatus::Pass,
            message: None,
            log_path: Some(log_path),
        }
    }

    pub fn fail(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: ValidationStepStatus::Fail,
            message: Some(message.into()),
            log_path: None,
        }
    }

    pub fn skip(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: ValidationStepStatus::Skip,
            message: Some(message.into()),
            log_path: None,
        }
    }

    fn with_log(mut self, log_path: PathBuf) -> Self {
        self.log_path = Some(log_path);
        self
    }

    pub fn is_failure(&self) -> bool {
        self.status == ValidationStepStatus::Fail
    }
}

/// Run `command` through the platform shell in `workspace`, output to `log_path`.
pub fn run_step(
    name: &str,
    command: &str,
    workspace: &Path,
    log_path: &Path,
    timeout: Duration,
) -> ValidationStepResult {
    let mut shell = shell_command(command);
    shell.current_dir(workspace);

    match run_logged(&mut shell, log_path, timeout) {
        Ok(outcome) if outcome.is_success() => {
            ValidationStepResult::pass(name, log_path.to_path_buf())
        }
        Ok(outcome) => {
            ValidationStepResult::fail(name, failure_message(command, &outcome, log_path, timeout))
                .with_log(log_path.to_path_buf())
        }
        Err(e) => ValidationStepResult::fail(
            name,
            format!(
                "{}\nCommand: {}\nFix: ensure the command is installed and in PATH.",
                e, command
            ),
        ),
    }
}

#[cfg(unix)]
fn shell_command(command: &str) -> Command {
    let mut shell = Command::new("sh");
    shell.arg("-c").arg(command);
    shell
}

#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    let mut shell = Command::new("cmd");
    shell.arg("/C").arg(command);
    shell
}

fn failure_message(
    command: &str,
    outcome: &ProcessOutcome,
    log_path: &Path,
    timeout: Duration,
) -> String {
    let mut msg = format!(
        "Command failed ({})\nCommand: {}\nLog: {}\n",
        outcome.describe(timeout),
        command,
        log_path.display()
    );

    let output = std::fs::read(log_path)
        .map(|bytes| String::from_utf8_lossy(&bytes).to_string())
        .unwrap_or_default();
    let tail = truncate_output(&output, FAILURE_TAIL_MAX_LINES, FAILURE_TAIL_MAX_CHARS);
    if !tail.is_empty() {
        msg.push_str("\nOutput (truncated):\n```\n");
        msg.push_str(&tail);
        msg.push_str("\n```\n");
    }
    msg
}

/// Keep the last `max_lines` lines, then the last `max_chars` characters.
pub(crate) fn truncate_output(output: &str, max_lines: usize, max_chars: usize) -> String {
    let lines: Vec<&str> = output.lines().collect();
    let start = lines.len().saturating_sub(max_lines);
    let result = lines[start..].join("\n");

    let char_count = result.chars().count();
    if char_count <= max_chars {
        return result;
    }
    let tail: String = result.chars().skip(char_count - max_chars).collect();
    format!("...(truncated)...\n{}", tail)
}
