//! Exit code constants for the perch CLI.
//!
//! - 0: Success (review request created)
//! - 1: Task failure (agent, no-op, test, build, publish)
//! - 2: Invalid input or missing prerequisite tool
//! - 3: Workspace / version-control failure
//! - 4: Cleanup failure (task outcome already determined, workspace needs manual removal)

/// Successful run: the review request exists.
pub const SUCCESS: i32 = 0;

/// The task itself failed: agent error, no change, failing tests/build, or publish error.
pub const TASK_FAILURE: i32 = 1;

/// Bad task descriptor, bad configuration, or a required tool is not installed.
pub const INVALID_INPUT: i32 = 2;

/// Worktree creation, branch, or other git failure.
pub const WORKSPACE_FAILURE: i32 = 3;

/// The workspace could not be reclaimed after the run.
pub const CLEANUP_FAILURE: i32 = 4;
