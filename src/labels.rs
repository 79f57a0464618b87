//! Best-effort label transitions on the originating work item.
//!
//! ```text
//! ready ─► in-queue ─► in-process ─► in-review
//!          (before the agent)       (after publish)
//! ```
//!
//! Each label is added or removed with its own call. A failed call is logged and recorded
//! as a run event; it never changes the outcome of the run.

use crate::config::LabelNames;
use crate::context::TaskPaths;
use crate::events::{self, Event, EventAction};
use crate::task::TaskDescriptor;
use crate::tracker::{Tracker, TrackerError};
use serde_json::json;
use tracing::{info, warn};

pub struct LabelUpdater<'a> {
    tracker: &'a dyn Tracker,
    labels: &'a LabelNames,
}

impl<'a> LabelUpdater<'a> {
    pub fn new(tracker: &'a dyn Tracker, labels: &'a LabelNames) -> Self {
        Self { tracker, labels }
    }

    /// Mark the work item as being processed. Returns false if `in-process` was not applied.
    pub fn mark_in_process(&self, task: &TaskDescriptor, paths: &TaskPaths) -> bool {
        self.transition(
            task,
            paths,
            &[self.labels.ready.as_str(), self.labels.in_queue.as_str()],
            &self.labels.in_process,
        )
    }

    /// Mark the work item as awaiting review. Returns false if `in-review` was not applied.
    pub fn mark_in_review(&self, task: &TaskDescriptor, paths: &TaskPaths) -> bool {
        self.transition(
            task,
            paths,
            &[self.labels.in_process.as_str()],
            &self.labels.in_review,
        )
    }

    /// One tracker call per label, so a label missing from the repository does not block
    /// the others.
    fn transition(
        &self,
        task: &TaskDescriptor,
        paths: &TaskPaths,
        remove: &[&str],
        add: &str,
    ) -> bool {
        for label in remove {
            if let Err(e) = self.tracker.remove_label(&task.id, label) {
                self.record_failure(task, paths, "remove", label, &e);
            }
        }

        match self.tracker.add_label(&task.id, add) {
            Ok(()) => {
                info!(issue = %task.id, label = add, "work item relabelled");
                true
            }
            Err(e) => {
                self.record_failure(task, paths, "add", add, &e);
                false
            }
        }
    }

    fn record_failure(
        &self,
        task: &TaskDescriptor,
        paths: &TaskPaths,
        operation: &str,
        label: &str,
        error: &TrackerError,
    ) {
        warn!(issue = %task.id, operation, label, error = %error, "label update failed");
        // The run log is best-effort here as well
        let _ = paths.log_line(&format!(
            "label update ({} '{}') failed: {}",
            operation, label, error
        ));
        events::record(
            paths,
            Event::new(EventAction::LabelUpdateFailed)
                .with_task(&task.id)
                .with_details(json!({
                    "operation": operation,
                    "label": label,
                    "error": error.to_string(),
                })),
        );
    }
}
