//! Implementation of the `perch clean` command.

use crate::config::Config;
use crate::error::Result;
use crate::task::TaskDescriptor;
use crate::workspace::WorkspaceManager;
use std::path::Path;

/// Destroy the workspace and branch of a task. Succeeds if there is nothing to remove.
pub fn cmd_clean(config: &Config, descriptor: &Path) -> Result<()> {
    let task = TaskDescriptor::load(descriptor, config)?;
    let manager = WorkspaceManager::new(config);
    let handle = manager.prepare(&task)?;

    manager.destroy(&handle)?;
    println!(
        "Reclaimed workspace {} (branch {})",
        handle.path.display(),
        handle.branch_name
    );
    Ok(())
}
