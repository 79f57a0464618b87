//! Issue tracker and review host integration.
//!
//! Work items and review requests live on a hosted platform (GitHub or GitLab). The
//! pipeline only needs four operations from it, captured by the [`Tracker`] trait;
//! [`CliTracker`] implements them by shelling out to the platform CLI (`gh` / `glab`),
//! which owns authentication.

mod cli;
mod repo;

pub use cli::CliTracker;
pub use repo::repo_slug;

use thiserror::Error;

/// A review request (pull request / merge request) to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRequest {
    /// Branch with the proposed change.
    pub head: String,
    /// Branch the change targets.
    pub base: String,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("failed to execute {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("{command} failed (exit code {code}): {stderr}")]
    Failed {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("{command} did not print a URL: {output}")]
    NoUrl { command: String, output: String },
}

/// Operations the pipeline performs on the hosting platform.
pub trait Tracker {
    /// Add one label to a work item.
    fn add_label(&self, issue: &str, label: &str) -> Result<(), TrackerError>;

    /// Remove one label from a work item.
    fn remove_label(&self, issue: &str, label: &str) -> Result<(), TrackerError>;

    /// Post a comment on a work item.
    fn comment(&self, issue: &str, body: &str) -> Result<(), TrackerError>;

    /// Open a review request and return its URL.
    fn create_review_request(&self, request: &ReviewRequest) -> Result<String, TrackerError>;

    /// URL of the open review request for `branch`, if there is one.
    fn find_review_request_url(&self, branch: &str) -> Result<Option<String>, TrackerError>;
}
