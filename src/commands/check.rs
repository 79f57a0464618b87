//! Implementation of the `perch check` command.

use crate::config::Config;
use crate::error::Result;
use crate::pipeline::Preflight;
use std::path::Path;

/// Run every pre-workspace check for a task and print what a run would use.
pub fn cmd_check(config: &Config, descriptor: &Path) -> Result<()> {
    let preflight = Preflight::check(config, descriptor)?;
    let task = &preflight.task;

    println!("Task:       #{} {}", task.id, task.title);
    println!("Project:    {} ({})", task.project_id, task.project_path.display());
    println!("Platform:   {} via {}", task.platform, preflight.tracker.program());
    println!("Workspace:  {}", preflight.handle.path.display());
    println!("Branch:     {}", preflight.handle.branch_name);
    println!("Base:       {} @ {}", preflight.handle.base_branch, preflight.handle.base_commit);
    println!("Log:        {}", preflight.paths.log_path.display());
    println!("Agent:      {}", shell_words::join(&preflight.plan.argv));
    println!("Lint:       {}", or_skip(&task.lint_command));
    println!("Test:       {}", or_skip(&task.test_command));
    println!("Build:      {}", or_skip(&task.build_command));
    println!();
    println!("All checks passed.");
    Ok(())
}

fn or_skip(command: &str) -> &str {
    if command.trim().is_empty() { "(skip)" } else { command }
}
