//! Per-task artifact locations.
//!
//! Everything a run leaves behind for post-mortem debugging lives under `logs_dir`,
//! named from the task's run key so reruns of the same task overwrite their own
//! artifacts and nothing else:
//!
//! ```text
//! <logs_dir>/
//! └── game/
//!     ├── task-42.log           # combined run log
//!     └── task-42/
//!         ├── prompt.md
//!         ├── agent.log
//!         ├── lint.log
//!         ├── test.log
//!         ├── build.log
//!         └── events.ndjson
//! ```

use crate::error::{PipelineError, Result};
use crate::task::TaskDescriptor;
use chrono::Utc;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Resolved artifact paths for one task. All paths are absolute when `logs_dir` is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskPaths {
    /// Combined run log (`<logs_dir>/<run_key>.log`).
    pub log_path: PathBuf,
    /// Directory for per-stage artifacts (`<logs_dir>/<run_key>/`).
    pub task_dir: PathBuf,
}

impl TaskPaths {
    pub fn new(logs_dir: &Path, task: &TaskDescriptor) -> Self {
        let key = task.run_key();
        Self {
            log_path: logs_dir.join(format!("{}.log", key)),
            task_dir: logs_dir.join(key),
        }
    }

    pub fn prompt_file(&self) -> PathBuf {
        self.task_dir.join("prompt.md")
    }

    /// Agent transcript.
    pub fn agent_log(&self) -> PathBuf {
        self.task_dir.join("agent.log")
    }

    /// Output of a validation step (`lint`, `test`, `build`).
    pub fn step_log(&self, step: &str) -> PathBuf {
        self.task_dir.join(format!("{}.log", step))
    }

    pub fn events_file(&self) -> PathBuf {
        self.task_dir.join("events.ndjson")
    }

    /// Create the artifact directory and start a fresh combined log.
    ///
    /// Artifacts of an earlier run of the same task are replaced.
    pub fn init(&self, header: &str) -> Result<()> {
        if self.task_dir.exists() {
            std::fs::remove_dir_all(&self.task_dir).map_err(|e| {
                log_error(&self.task_dir, "failed to clear artifact directory", e)
            })?;
        }
        std::fs::create_dir_all(&self.task_dir)
            .map_err(|e| log_error(&self.task_dir, "failed to create artifact directory", e))?;

        std::fs::write(&self.log_path, format!("{}\n", header.trim_end()))
            .map_err(|e| log_error(&self.log_path, "failed to create run log", e))
    }

    /// Append a timestamped line to the combined log.
    pub fn log_line(&self, message: &str) -> Result<()> {
        let line = format!("[{}] {}\n", Utc::now().to_rfc3339(), message);
        append(&self.log_path, line.as_bytes())
    }

    /// Append the contents of an artifact file to the combined log under a heading.
    ///
    /// A missing artifact is recorded as such rather than failing.
    pub fn append_section(&self, title: &str, artifact: &Path) -> Result<()> {
        let mut section = format!("\n===== {} ({}) =====\n", title, artifact.display());
        match std::fs::read(artifact) {
            Ok(bytes) => section.push_str(&String::from_utf8_lossy(&bytes)),
            Err(e) => section.push_str(&format!("<unavailable: {}>", e)),
        }
        if !section.ends_with('\n') {
            section.push('\n');
        }
        section.push_str(&format!("===== end {} =====\n", title));
        append(&self.log_path, section.as_bytes())
    }
}

fn append(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| log_error(path, "failed to open run log", e))?;
    file.write_all(bytes)
        .map_err(|e| log_error(path, "failed to write run log", e))
}

fn log_error(path: &Path, what: &str, e: std::io::Error) -> PipelineError {
    PipelineError::Config(format!("{} '{}': {}", what, path.display(), e))
}
