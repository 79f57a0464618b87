//! External process execution with captured output and bounded runtime.
//!
//! Every long-running child (the agent, lint/test/build commands) goes through
//! [`run_logged`]: stdout and stderr are interleaved into one log file, the child is
//! killed when its timeout expires, and a shutdown request (SIGINT/SIGTERM) kills it
//! early so the pipeline can unwind and reclaim the workspace.
//!
//! On Unix the child leads its own process group, and killing it kills the group, so
//! whatever a `sh -c` command line started does not outlive the workspace.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Ask running and future children to stop. Called from the signal handler.
pub fn request_shutdown() {
    SHUTDOWN.store(true, Ordering::SeqCst);
}

pub fn shutdown_requested() -> bool {
    SHUTDOWN.load(Ordering::SeqCst)
}

/// How a child process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// Exit code (None if killed or terminated by a signal).
    pub exit_code: Option<i32>,
    /// Killed because the timeout expired.
    pub timed_out: bool,
    /// Killed because shutdown was requested.
    pub interrupted: bool,
    pub duration: Duration,
}

impl ProcessOutcome {
    pub fn is_success(&self) -> bool {
        !self.timed_out && !self.interrupted && self.exit_code == Some(0)
    }

    /// One-line human description, e.g. `exit code 2` or `timed out after 30s`.
    pub fn describe(&self, timeout: Duration) -> String {
        if self.interrupted {
            "interrupted by shutdown request".to_string()
        } else if self.timed_out {
            format!("timed out after {}s", timeout.as_secs())
        } else {
            match self.exit_code {
                Some(code) => format!("exit code {}", code),
                None => "terminated by signal".to_string(),
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to create log file '{}': {source}", path.display())]
    Log {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("failed to check process status: {0}")]
    Wait(#[source] std::io::Error),
}

/// Run `command` to completion, sending stdout and stderr to `log_path`.
///
/// The log file is truncated first. Stdin is closed.
pub fn run_logged(
    command: &mut Command,
    log_path: &Path,
    timeout: Duration,
) -> Result<ProcessOutcome, ProcessError> {
    let program = command.get_program().to_string_lossy().to_string();

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ProcessError::Log {
            path: log_path.to_path_buf(),
            source,
        })?;
    }
    let stdout = File::create(log_path).map_err(|source| ProcessError::Log {
        path: log_path.to_path_buf(),
        source,
    })?;
    let stderr = stdout.try_clone().map_err(|source| ProcessError::Log {
        path: log_path.to_path_buf(),
        source,
    })?;

    command
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr));
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    debug!(program = %program, log = %log_path.display(), "spawning process");
    let start = Instant::now();
    let mut child = command
        .spawn()
        .map_err(|source| ProcessError::Spawn { program, source })?;

    let (exit_code, timed_out, interrupted) = wait_with_timeout(&mut child, timeout)?;

    Ok(ProcessOutcome {
        exit_code,
        timed_out,
        interrupted,
        duration: start.elapsed(),
    })
}

/// Poll until the child exits, the timeout expires, or shutdown is requested.
///
/// Returns (exit_code, timed_out, interrupted).
fn wait_with_timeout(
    child: &mut Child,
    timeout: Duration,
) -> Result<(Option<i32>, bool, bool), ProcessError> {
    let start = Instant::now();

    loop {
        match child.try_wait().map_err(ProcessError::Wait)? {
            Some(status) => return Ok((status.code(), false, false)),
            None => {
                if shutdown_requested() {
                    warn!(pid = child.id(), "shutdown requested, killing child process");
                    kill_process(child);
                    return Ok((None, false, true));
                }
                if start.elapsed() >= timeout {
                    warn!(pid = child.id(), timeout_secs = timeout.as_secs(), "child process timed out, killing");
                    kill_process(child);
                    return Ok((None, true, false));
                }
                std::thread::sleep(POLL_INTERVAL);
            }
        }
    }
}

/// SIGKILL the child's process group, then the child itself, and reap it.
#[cfg(unix)]
fn kill_process(child: &mut Child) {
    let group = format!("-{}", child.id());
    match Command::new("kill")
        .args(["-KILL", "--", &group])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
    {
        Ok(status) if status.success() => {}
        Ok(status) => debug!(group = %group, %status, "kill of process group failed"),
        Err(e) => warn!(group = %group, error = %e, "could not run kill for process group"),
    }
    let _ = child.kill();
    let _ = child.wait();
}

/// Kill a process and reap it.
#[cfg(not(unix))]
fn kill_process(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Resolve a program the way `Command::new` will: a path containing a separator must
/// exist, a bare name must be found in `PATH`.
pub fn find_program(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }

    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(program))
        .find(|full| is_executable(full))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}
