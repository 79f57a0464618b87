//! Perch: runs one queued work item through an isolated workspace, a code-generation
//! agent, project validation, and a review request.
//!
//! This is the main entry point for the `perch` CLI. It parses arguments,
//! installs logging and the signal handler, dispatches to the command handler,
//! and maps errors to exit codes.

mod agent;
mod changes;
mod cli;
mod commands;
mod config;
mod context;
mod error;
mod events;
mod exit_codes;
mod git;
mod labels;
mod logging;
mod pipeline;
mod process;
mod publish;
mod task;
mod template;
#[cfg(test)]
mod test_support;
mod tracker;
mod validate;
mod workspace;

use cli::Cli;
use std::process::ExitCode;
use tracing::warn;

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    logging::init(cli.verbose);

    // Children are killed and the workspace reclaimed by the running stage
    if let Err(e) = ctrlc::set_handler(|| {
        warn!("shutdown requested; stopping the current stage");
        process::request_shutdown();
    }) {
        warn!(error = %e, "failed to install signal handler");
    }

    match commands::dispatch(cli.command, cli.config.as_deref()) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {}", err);

            // Return appropriate exit code
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
