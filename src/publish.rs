//! Publishing a validated change: commit, push, review request, and a back-reference
//! on the originating work item.

use crate::context::TaskPaths;
use crate::error::{PipelineError, Result};
use crate::git::run_git;
use crate::task::TaskDescriptor;
use crate::tracker::{ReviewRequest, Tracker};
use crate::workspace::WorkspaceHandle;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishResult {
    pub review_url: String,
}

pub struct PublishManager<'a> {
    tracker: &'a dyn Tracker,
    remote: &'a str,
}

impl<'a> PublishManager<'a> {
    pub fn new(tracker: &'a dyn Tracker, remote: &'a str) -> Self {
        Self { tracker, remote }
    }

    /// Commit everything in the workspace, push the branch, open the review request
    /// and link it from the work item. Any failing step is a `PipelineError::Publish`.
    #[instrument(skip_all, fields(task = %task.id, branch = %handle.branch_name))]
    pub fn publish(
        &self,
        handle: &WorkspaceHandle,
        task: &TaskDescriptor,
        paths: &TaskPaths,
    ) -> Result<PublishResult> {
        self.commit(handle, task)?;
        self.push(handle)?;

        let request = ReviewRequest {
            head: handle.branch_name.clone(),
            base: handle.base_branch.clone(),
            title: commit_subject(task),
            body: review_body(task, paths),
        };
        let review_url = self.open_review_request(&request)?;
        info!(url = %review_url, "review request open");

        self.tracker
            .comment(&task.id, &format!("Review request: {}", review_url))
            .map_err(|e| {
                PipelineError::Publish(format!(
                    "review request {} is open but commenting on work item #{} failed: {}",
                    review_url, task.id, e
                ))
            })?;

        Ok(PublishResult { review_url })
    }

    fn commit(&self, handle: &WorkspaceHandle, task: &TaskDescriptor) -> Result<()> {
        run_git(&handle.path, &["add", "-A"])
            .map_err(|e| publish_error("failed to stage changes", e))?;

        // Everything may already be committed if the agent ignored the prompt
        let staged = run_git(&handle.path, &["diff", "--cached", "--name-only"])
            .map_err(|e| publish_error("failed to inspect staged changes", e))?;
        if staged.is_empty() {
            warn!("nothing staged; publishing the agent's own commits");
            return Ok(());
        }

        run_git(&handle.path, &["commit", "-m", &commit_message(task)])
            .map_err(|e| publish_error("failed to commit changes", e))?;
        Ok(())
    }

    fn push(&self, handle: &WorkspaceHandle) -> Result<()> {
        run_git(
            &handle.path,
            &["push", "--force", "-u", self.remote, &handle.branch_name],
        )
        .map_err(|e| {
            publish_error(
                &format!(
                    "failed to push branch '{}' to '{}'",
                    handle.branch_name, self.remote
                ),
                e,
            )
        })?;
        Ok(())
    }

    /// Create the review request, or reuse the one a previous run opened for the branch.
    fn open_review_request(&self, request: &ReviewRequest) -> Result<String> {
        match self.tracker.create_review_request(request) {
            Ok(url) => Ok(url),
            Err(create_err) => match self.tracker.find_review_request_url(&request.head) {
                Ok(Some(url)) => {
                    warn!(url = %url, error = %create_err, "reusing existing review request");
                    Ok(url)
                }
                _ => Err(PipelineError::Publish(format!(
                    "failed to open review request for '{}': {}",
                    request.head, create_err
                ))),
            },
        }
    }
}

fn commit_subject(task: &TaskDescriptor) -> String {
    format!("Task #{}: {}", task.id, task.title)
}

fn commit_message(task: &TaskDescriptor) -> String {
    format!("{}\n\nSource: {}\n", commit_subject(task), task.source_url)
}

fn review_body(task: &TaskDescriptor, paths: &TaskPaths) -> String {
    format!(
        "Automated change for {source}\n\n\
         **Complexity:** {complexity}\n\n\
         ## Task description\n\n\
         {body}\n\n\
         ---\n\
         Agent transcript: `{transcript}`\n\
         Run log: `{log}`\n",
        source = task.source_url,
        complexity = task.complexity,
        body = task.body.trim_end(),
        transcript = paths.agent_log().display(),
        log = paths.log_path.display(),
    )
}

fn publish_error(what: &str, e: PipelineError) -> PipelineError {
    PipelineError::Publish(format!("{}: {}", what, e))
}
