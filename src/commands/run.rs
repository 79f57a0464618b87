//! Implementation of the `perch run` command.

use crate::config::Config;
use crate::error::Result;
use crate::pipeline;
use std::path::Path;

/// Execute the pipeline for one task descriptor.
///
/// When both the task and the cleanup failed, the task error is printed here and the
/// cleanup error is returned so the process exits with the cleanup code.
pub fn cmd_run(config: &Config, descriptor: &Path) -> Result<()> {
    let report = pipeline::run(config, descriptor);

    if let Some(task_id) = &report.task_id {
        println!("Task #{}: {}", task_id, report.state);
    }
    if let Some(log_path) = &report.log_path {
        println!("Log: {}", log_path.display());
    }

    match (report.outcome, report.cleanup) {
        (Ok(published), Ok(())) => {
            println!("Review request: {}", published.review_url);
            Ok(())
        }
        (Ok(published), Err(cleanup)) => {
            println!("Review request: {}", published.review_url);
            Err(cleanup)
        }
        (Err(task), Ok(())) => Err(task),
        (Err(task), Err(cleanup)) => {
            eprintln!("Error: {}", task);
            Err(cleanup)
        }
    }
}
