//! CLI argument parsing for perch.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Perch: run one queued work item through agent, validation, and review.
///
/// Each run works in its own git worktree and branch, derived from the task's project
/// and id, and reclaims them when it ends.
#[derive(Parser, Debug)]
#[command(name = "perch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// YAML configuration file. Built-in defaults are used when omitted.
    #[arg(short, long, global = true, env = "PERCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Debug-level diagnostics (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for perch.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Execute the pipeline for a task descriptor.
    ///
    /// Exit codes: 0 success, 1 task failure, 2 invalid input or missing tool,
    /// 3 workspace/git error, 4 cleanup failure.
    Run(DescriptorArgs),

    /// Validate a task descriptor and the environment without running anything.
    ///
    /// Prints the derived workspace, branch, log path, and agent command.
    Check(DescriptorArgs),

    /// Reclaim the workspace and branch of a task.
    ///
    /// For workspaces left behind by a run that reported a cleanup failure.
    Clean(DescriptorArgs),
}

/// Arguments naming a task descriptor file.
#[derive(Args, Debug)]
pub struct DescriptorArgs {
    /// Path to the task descriptor JSON file.
    pub descriptor: PathBuf,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
