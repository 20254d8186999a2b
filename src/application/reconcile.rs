//! Check-run reconciliation: the create-vs-update state machine keyed by
//! commit sha.

use crate::domain::{CheckRequest, CheckRun, CheckStatus, CommitRecord, PipelineError};
use crate::infra::github::GitHubHost;
use crate::infra::store::CommitStore;
use std::sync::Arc;

/// Decides whether a requested status lands on the commit's existing check
/// run or on a freshly created one, then writes the outcome back to the
/// commit record.
pub struct Reconciler {
    host: Arc<dyn GitHubHost>,
    store: Arc<dyn CommitStore>,
}

impl Reconciler {
    pub fn new(host: Arc<dyn GitHubHost>, store: Arc<dyn CommitStore>) -> Self {
        Self { host, store }
    }

    /// Publish a check-run state for the request's head commit.
    ///
    /// The existing run is updated in place only when all three hold:
    /// a run id is on record, the transition is not reverting away from a
    /// completed state, and the prior payload carried no images. Anything
    /// else creates a new run; in particular a completed run that published
    /// images is never overwritten, since an update could leave its images
    /// attributed to the wrong result.
    ///
    /// Replaying the same call converges to the same external state, which
    /// is what makes webhook retries safe.
    pub async fn reconcile(&self, mut request: CheckRequest) -> Result<CheckRun, PipelineError> {
        let prior = self.store.commit_record(&request.head_sha).await?;

        let is_completed = request.status == CheckStatus::Completed;
        let reverting_after_complete = !is_completed
            && prior
                .as_ref()
                .is_some_and(|p| p.report_status == Some(CheckStatus::Completed));
        let has_images = request.carries_images();

        if is_completed {
            request.completed_at = Some(chrono::Utc::now().to_rfc3339());
        }

        let existing_run = prior.as_ref().and_then(|p| {
            (!reverting_after_complete && p.has_images == Some(false))
                .then_some(p.report_id)
                .flatten()
        });

        let run = match existing_run {
            Some(id) => {
                log::info!("updating check run {id} for {}", request.head_sha);
                self.host.update_check(id, &request).await?
            }
            None => {
                log::info!(
                    "creating check run for {} ({})",
                    request.head_sha,
                    request.status
                );
                self.host.create_check(&request).await?
            }
        };

        self.store
            .merge_commit_record(&request.head_sha, &CommitRecord::report_fields(&run, has_images))
            .await?;
        Ok(run)
    }
}
