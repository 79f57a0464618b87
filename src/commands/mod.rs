//! Command implementations for perch.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations.

mod check;
mod clean;
mod run;

use crate::cli::Command;
use crate::config::Config;
use crate::error::Result;
use std::path::Path;

/// Dispatch a command to its implementation.
pub fn dispatch(command: Command, config_path: Option<&Path>) -> Result<()> {
    let config = Config::load_or_default(config_path)?;

    match command {
        Command::Run(args) => run::cmd_run(&config, &args.descriptor),
        Command::Check(args) => check::cmd_check(&config, &args.descriptor),
        Command::Clean(args) => clean::cmd_clean(&config, &args.descriptor),
    }
}
