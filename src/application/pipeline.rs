//! Pipeline orchestration: event entry, outcome mapping, and deferred
//! re-entry once upstream snapshots become available.

use crate::application::diff::diff_trees;
use crate::application::lockfile::{Resolution, resolve_update_commits};
use crate::application::materialize::Materializer;
use crate::application::reconcile::Reconciler;
use crate::domain::{
    CheckConclusion, CheckImage, CheckOutput, CheckRequest, CheckStatus, CommitRecord, DiffReport,
    HostError, PipelineError,
};
use crate::infra::blob::BlobStore;
use crate::infra::github::GitHubHost;
use crate::infra::store::CommitStore;
use std::path::PathBuf;
use std::sync::Arc;

/// Pull-request actions that start a pipeline run.
pub const QUALIFYING_ACTIONS: &[&str] = &["opened", "reopened", "synchronize", "edited"];

/// A qualifying pull-request lifecycle event, as delivered by the webhook.
#[derive(Debug, Clone)]
pub struct PullRequestEvent {
    pub action: String,
    pub number: u64,
    pub owner: String,
    pub repo: String,
    pub head_sha: String,
    pub base_sha: String,
    pub installation_id: Option<u64>,
}

impl PullRequestEvent {
    pub fn qualifies(&self) -> bool {
        QUALIFYING_ACTIONS.contains(&self.action.as_str())
    }
}

/// Orchestrator knobs that come from configuration.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub snapshot_root: PathBuf,
    pub lock_file_path: String,
    pub s3_bucket: String,
    pub files_per_page: u32,
}

impl PipelineSettings {
    pub fn new(snapshot_root: impl Into<PathBuf>, lock_file_path: &str, s3_bucket: &str) -> Self {
        Self {
            snapshot_root: snapshot_root.into(),
            lock_file_path: lock_file_path.to_string(),
            s3_bucket: s3_bucket.to_string(),
            files_per_page: 100,
        }
    }
}

/// Outcome of the `complete_check` route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompleteCheckOutcome {
    Resolved,
    AlreadyResolved,
    NotComplete,
    UnknownCommit,
}

/// Decision for the deferred re-entry route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RerunPlan {
    Run(RerunContext),
    CheckNotInProgress,
    /// The pull request has closed or its head has moved past this commit.
    Stale,
    UnknownCommit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RerunContext {
    pub owner: String,
    pub repo: String,
    pub base_sha: String,
    pub current_sha: String,
}

/// Wires resolver, materializer, diff engine and reconciler together in
/// response to lifecycle events.
pub struct Pipeline {
    host: Arc<dyn GitHubHost>,
    blob: Arc<dyn BlobStore>,
    store: Arc<dyn CommitStore>,
    reconciler: Reconciler,
    materializer: Materializer,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        host: Arc<dyn GitHubHost>,
        blob: Arc<dyn BlobStore>,
        store: Arc<dyn CommitStore>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            reconciler: Reconciler::new(host.clone(), store.clone()),
            materializer: Materializer::new(blob.clone()),
            host,
            blob,
            store,
            settings,
        }
    }

    /// Entry point for a qualifying pull-request event.
    pub async fn handle_pull_request_event(
        &self,
        event: &PullRequestEvent,
    ) -> Result<(), PipelineError> {
        log::info!(
            "pull_request {} on {}/{}#{}: head {} base {}",
            event.action,
            event.owner,
            event.repo,
            event.number,
            event.head_sha,
            event.base_sha
        );

        self.reconciler
            .reconcile(CheckRequest::new(
                &event.owner,
                &event.repo,
                &event.head_sha,
                CheckStatus::Queued,
            ))
            .await?;

        let lock_file_touched = self
            .is_lock_file_modified(&event.owner, &event.repo, event.number)
            .await?;

        self.store
            .merge_commit_record(
                &event.head_sha,
                &CommitRecord::meta_fields(&event.owner, &event.repo, event.installation_id),
            )
            .await?;
        self.store
            .set_pull_ref(&event.head_sha, event.number)
            .await?;

        if !lock_file_touched {
            self.reconciler
                .reconcile(
                    CheckRequest::new(
                        &event.owner,
                        &event.repo,
                        &event.head_sha,
                        CheckStatus::Completed,
                    )
                    .with_conclusion(CheckConclusion::Success)
                    .with_output(CheckOutput::text(
                        "All good!",
                        "No lockfile changes in this PR",
                    )),
                )
                .await?;
            return Ok(());
        }

        self.diff_and_reconcile(&event.owner, &event.repo, &event.base_sha, &event.head_sha)
            .await
    }

    /// Resolve a completed `action_required` check to `success`.
    pub async fn complete_check(
        &self,
        sha: &str,
    ) -> Result<CompleteCheckOutcome, PipelineError> {
        let Some(record) = self.store.commit_record(sha).await? else {
            return Ok(CompleteCheckOutcome::UnknownCommit);
        };
        let Some((owner, repo)) = record.owner_repo() else {
            return Ok(CompleteCheckOutcome::UnknownCommit);
        };

        let is_complete = record.report_status == Some(CheckStatus::Completed);
        let is_action_required =
            record.report_conclusion == Some(CheckConclusion::ActionRequired);

        if is_complete && is_action_required {
            self.reconciler
                .reconcile(
                    CheckRequest::new(owner, repo, sha, CheckStatus::Completed)
                        .with_conclusion(CheckConclusion::Success),
                )
                .await?;
            return Ok(CompleteCheckOutcome::Resolved);
        }
        if is_complete {
            return Ok(CompleteCheckOutcome::AlreadyResolved);
        }
        Ok(CompleteCheckOutcome::NotComplete)
    }

    /// Decide whether a deferred re-entry should run the diff again. Only an
    /// `in_progress` check whose pull request is still open and still points
    /// at this head commit qualifies.
    pub async fn plan_rerun(&self, sha: &str) -> Result<RerunPlan, PipelineError> {
        let Some(record) = self.store.commit_record(sha).await? else {
            return Ok(RerunPlan::UnknownCommit);
        };
        let Some((owner, repo)) = record.owner_repo() else {
            return Ok(RerunPlan::UnknownCommit);
        };
        if record.report_status != Some(CheckStatus::InProgress) {
            return Ok(RerunPlan::CheckNotInProgress);
        }
        let Some(number) = self.store.pull_ref(sha).await? else {
            return Ok(RerunPlan::UnknownCommit);
        };

        let pull = self.host.pull_request(owner, repo, number).await?;
        if pull.is_open() && pull.head_sha == sha {
            Ok(RerunPlan::Run(RerunContext {
                owner: owner.to_string(),
                repo: repo.to_string(),
                base_sha: pull.base_sha,
                current_sha: sha.to_string(),
            }))
        } else {
            Ok(RerunPlan::Stale)
        }
    }

    pub async fn run_rerun(&self, context: &RerunContext) -> Result<(), PipelineError> {
        self.diff_and_reconcile(
            &context.owner,
            &context.repo,
            &context.base_sha,
            &context.current_sha,
        )
        .await
    }

    /// Run the diff and publish its outcome, resolving the two expected
    /// not-found conditions to status transitions. Every other error aborts
    /// the run without touching the check.
    async fn diff_and_reconcile(
        &self,
        owner: &str,
        repo: &str,
        base_sha: &str,
        current_sha: &str,
    ) -> Result<(), PipelineError> {
        match self.run_diff(owner, repo, base_sha, current_sha).await {
            Ok(report) => {
                self.publish_report(owner, repo, base_sha, current_sha, &report)
                    .await
            }
            Err(PipelineError::LockFileNotFound) => {
                log::info!("lock file not found for {current_sha}");
                self.reconciler
                    .reconcile(
                        CheckRequest::new(owner, repo, current_sha, CheckStatus::Completed)
                            .with_conclusion(CheckConclusion::Neutral)
                            .with_output(CheckOutput::text(
                                "Lockfile not found",
                                "Should not lead to any inconsistencies in snapshots",
                            )),
                    )
                    .await?;
                Ok(())
            }
            Err(PipelineError::ArchiveNotFound { key }) => {
                log::info!("snapshot archive {key} not uploaded yet for {current_sha}");
                self.reconciler
                    .reconcile(
                        CheckRequest::new(owner, repo, current_sha, CheckStatus::InProgress)
                            .with_output(CheckOutput::text(
                                "Waiting for snapshots",
                                "Waiting for the snapshots to be uploaded from CI",
                            )),
                    )
                    .await?;
                Ok(())
            }
            Err(other) => Err(other),
        }
    }

    async fn run_diff(
        &self,
        owner: &str,
        repo: &str,
        base_sha: &str,
        current_sha: &str,
    ) -> Result<DiffReport, PipelineError> {
        let current_lock = self.lock_file_at(owner, repo, current_sha).await?;
        let base_lock = self.lock_file_at(owner, repo, base_sha).await?;

        match resolve_update_commits(&base_lock, &current_lock)? {
            Resolution::Unchanged => {
                log::info!("lock file content is the same for {current_sha}");
                Ok(DiffReport::empty())
            }
            Resolution::Changed {
                base_update,
                current_update,
            } => {
                let scratch = self.settings.snapshot_root.join(current_sha);
                let (base_tree, current_tree) = self
                    .materializer
                    .materialize(&base_update, &current_update, &scratch)
                    .await?;
                diff_trees(&base_tree, &current_tree, &scratch.join("__diff__")).await
            }
        }
    }

    async fn lock_file_at(
        &self,
        owner: &str,
        repo: &str,
        git_ref: &str,
    ) -> Result<String, PipelineError> {
        self.host
            .file_content(owner, repo, &self.settings.lock_file_path, git_ref)
            .await
            .map_err(|e| match e {
                HostError::NotFound => PipelineError::LockFileNotFound,
                other => PipelineError::Host(other),
            })
    }

    async fn publish_report(
        &self,
        owner: &str,
        repo: &str,
        base_sha: &str,
        current_sha: &str,
        report: &DiffReport,
    ) -> Result<(), PipelineError> {
        if report.is_empty() {
            self.reconciler
                .reconcile(
                    CheckRequest::new(owner, repo, current_sha, CheckStatus::Completed)
                        .with_conclusion(CheckConclusion::Success)
                        .with_output(CheckOutput::text("All good!", "No snapshot differences")),
                )
                .await?;
            return Ok(());
        }

        // One object at a time; uploads are deliberately not fanned out.
        for record in &report.all {
            let key = format!(
                "__diff__/{current_sha}:{base_sha}{}",
                record.display_path
            );
            let bytes = std::fs::read(&record.file_path)?;
            self.blob.put(&key, bytes, "image/png").await?;
        }

        let images = report
            .all
            .iter()
            .map(|record| CheckImage {
                alt: record.display_path.clone(),
                image_url: format!(
                    "https://{}.s3.amazonaws.com/__diff__/{current_sha}:{base_sha}{}",
                    self.settings.s3_bucket, record.display_path
                ),
                caption: record.display_path.clone(),
            })
            .collect();

        let noun = if report.total == 1 {
            "snapshot"
        } else {
            "snapshots"
        };
        self.reconciler
            .reconcile(
                CheckRequest::new(owner, repo, current_sha, CheckStatus::Completed)
                    .with_conclusion(CheckConclusion::ActionRequired)
                    .with_output(CheckOutput {
                        title: format!("{} {noun} will be updated", report.total),
                        summary: "View the differences below".to_string(),
                        images,
                    }),
            )
            .await?;
        Ok(())
    }

    async fn is_lock_file_modified(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<bool, PipelineError> {
        let mut page = 1;
        loop {
            let files = self
                .host
                .pull_files(owner, repo, number, page, self.settings.files_per_page)
                .await?;
            if files.is_empty() {
                return Ok(false);
            }
            if files
                .iter()
                .any(|file| file.filename == self.settings.lock_file_path)
            {
                return Ok(true);
            }
            page += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{FakeBlob, FakeHost, FakeStore};
    use crate::infra::github::PullRequestInfo;
    use image::{ImageFormat, Rgba, RgbaImage};

    const LOCK_PATH: &str = "pixophilic.lock";

    fn png(width: u32, height: u32, painter: impl Fn(u32, u32) -> Rgba<u8>) -> Vec<u8> {
        let img = RgbaImage::from_fn(width, height, painter);
        let mut bytes = std::io::Cursor::new(Vec::new());
        img.write_to(&mut bytes, ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    fn tgz(entries: &[(&str, Vec<u8>)]) -> Vec<u8> {
        let borrowed: Vec<(&str, &[u8])> = entries
            .iter()
            .map(|(path, bytes)| (*path, bytes.as_slice()))
            .collect();
        crate::infra::archive::test_support::build_tgz(&borrowed)
    }

    struct Harness {
        host: Arc<FakeHost>,
        blob: Arc<FakeBlob>,
        store: Arc<FakeStore>,
        pipeline: Pipeline,
        _scratch: tempfile::TempDir,
    }

    fn harness() -> Harness {
        let host = FakeHost::new();
        let blob = FakeBlob::new();
        let store = FakeStore::new();
        let scratch = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(
            host.clone(),
            blob.clone(),
            store.clone(),
            PipelineSettings::new(scratch.path(), LOCK_PATH, "snapshots"),
        );
        Harness {
            host,
            blob,
            store,
            pipeline,
            _scratch: scratch,
        }
    }

    fn event() -> PullRequestEvent {
        PullRequestEvent {
            action: "synchronize".to_string(),
            number: 12,
            owner: "octo".to_string(),
            repo: "widgets".to_string(),
            head_sha: "headsha".to_string(),
            base_sha: "basesha".to_string(),
            installation_id: Some(7),
        }
    }

    #[test]
    fn only_lifecycle_actions_qualify() {
        for action in ["opened", "reopened", "synchronize", "edited"] {
            let mut ev = event();
            ev.action = action.to_string();
            assert!(ev.qualifies());
        }
        let mut ev = event();
        ev.action = "labeled".to_string();
        assert!(!ev.qualifies());
    }

    #[tokio::test]
    async fn untouched_lock_file_short_circuits_to_success() {
        let h = harness();
        h.host
            .set_pull_file_pages(vec![vec!["src/app.js", "README.md"]]);

        h.pipeline.handle_pull_request_event(&event()).await.unwrap();

        let last = h.host.last_check().unwrap();
        assert_eq!(last.status, CheckStatus::Completed);
        assert_eq!(last.conclusion, Some(CheckConclusion::Success));
        assert_eq!(
            last.output.unwrap().summary,
            "No lockfile changes in this PR"
        );
        // queued create, then in-place update
        assert_eq!(h.host.created.lock().unwrap().len(), 1);
        assert_eq!(h.host.updated.lock().unwrap().len(), 1);
        // Bookkeeping written for deferred re-entry.
        assert_eq!(h.store.record("headsha").unwrap().owner_repo(), Some(("octo", "widgets")));
        assert_eq!(h.store.pull_ref("headsha").await.unwrap(), Some(12));
    }

    #[tokio::test]
    async fn lock_file_on_a_later_page_is_found() {
        let h = harness();
        h.host.set_pull_file_pages(vec![
            vec!["src/a.js", "src/b.js"],
            vec!["docs/c.md", LOCK_PATH],
        ]);
        // Identical lock files on both refs: diff resolves to no differences.
        h.host.set_file(LOCK_PATH, "headsha", "last_update_commit: aaa\n");
        h.host.set_file(LOCK_PATH, "basesha", "last_update_commit: aaa\n");

        h.pipeline.handle_pull_request_event(&event()).await.unwrap();

        let last = h.host.last_check().unwrap();
        assert_eq!(last.output.unwrap().summary, "No snapshot differences");
    }

    #[tokio::test]
    async fn identical_lock_files_never_touch_the_blob_store() {
        let h = harness();
        h.host.set_pull_file_pages(vec![vec![LOCK_PATH]]);
        let text = "last_update_commit: aaa\n";
        h.host.set_file(LOCK_PATH, "headsha", text);
        h.host.set_file(LOCK_PATH, "basesha", text);

        h.pipeline.handle_pull_request_event(&event()).await.unwrap();

        // The fake blob holds no archives; had it been consulted the check
        // would have parked in_progress instead of completing green.
        assert!(h.blob.put_keys.lock().unwrap().is_empty());
        let last = h.host.last_check().unwrap();
        assert_eq!(last.status, CheckStatus::Completed);
        assert_eq!(last.conclusion, Some(CheckConclusion::Success));
    }

    #[tokio::test]
    async fn missing_lock_file_concludes_neutral() {
        let h = harness();
        h.host.set_pull_file_pages(vec![vec![LOCK_PATH]]);
        // No file contents registered: both fetches 404.

        h.pipeline.handle_pull_request_event(&event()).await.unwrap();

        let last = h.host.last_check().unwrap();
        assert_eq!(last.status, CheckStatus::Completed);
        assert_eq!(last.conclusion, Some(CheckConclusion::Neutral));
        assert_eq!(last.output.unwrap().title, "Lockfile not found");
    }

    #[tokio::test]
    async fn missing_archive_parks_the_check_in_progress() {
        let h = harness();
        h.host.set_pull_file_pages(vec![vec![LOCK_PATH]]);
        h.host.set_file(LOCK_PATH, "headsha", "last_update_commit: bbb\n");
        h.host.set_file(LOCK_PATH, "basesha", "last_update_commit: aaa\n");
        // Blob store has neither archive.

        h.pipeline.handle_pull_request_event(&event()).await.unwrap();

        let last = h.host.last_check().unwrap();
        assert_eq!(last.status, CheckStatus::InProgress);
        assert_eq!(last.conclusion, None);
        assert_eq!(last.output.unwrap().title, "Waiting for snapshots");
        assert!(h.blob.put_keys.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn differing_snapshots_publish_images_and_require_action() {
        let h = harness();
        h.host.set_pull_file_pages(vec![vec![LOCK_PATH]]);
        h.host.set_file(LOCK_PATH, "headsha", "last_update_commit: bbb\n");
        h.host.set_file(LOCK_PATH, "basesha", "last_update_commit: aaa\n");

        let black = |_, _| Rgba([0u8, 0, 0, 255]);
        let shifted = |_, y: u32| {
            if y < 10 {
                Rgba([255u8, 0, 0, 255])
            } else {
                Rgba([0, 0, 0, 255])
            }
        };
        let barely = |x: u32, y: u32| {
            if y == 0 && x < 10 {
                Rgba([255u8, 0, 0, 255])
            } else {
                Rgba([0, 0, 0, 255])
            }
        };
        {
            let mut objects = h.blob.objects.lock().unwrap();
            objects.insert(
                "aaa.tgz".to_string(),
                tgz(&[
                    ("x.png", png(50, 50, black)),
                    ("y.png", png(50, 50, black)),
                    ("removed.png", png(4, 4, black)),
                ]),
            );
            objects.insert(
                "bbb.tgz".to_string(),
                tgz(&[
                    ("x.png", png(50, 50, shifted)),
                    ("y.png", png(50, 50, barely)),
                    ("added.png", png(4, 4, black)),
                ]),
            );
        }

        h.pipeline.handle_pull_request_event(&event()).await.unwrap();

        let uploaded = h.blob.put_keys.lock().unwrap().clone();
        assert_eq!(
            uploaded,
            vec![
                "__diff__/headsha:basesha/x.png",
                "__diff__/headsha:basesha/added.png",
                "__diff__/headsha:basesha/removed.png",
            ]
        );

        let last = h.host.last_check().unwrap();
        assert_eq!(last.conclusion, Some(CheckConclusion::ActionRequired));
        let output = last.output.unwrap();
        assert_eq!(output.title, "3 snapshots will be updated");
        assert_eq!(output.images.len(), 3);
        assert_eq!(
            output.images[0].image_url,
            "https://snapshots.s3.amazonaws.com/__diff__/headsha:basesha/x.png"
        );
        assert_eq!(output.images[1].caption, "/added.png");
    }

    #[tokio::test]
    async fn complete_check_resolves_only_pending_action_required() {
        let h = harness();
        h.host.set_pull_file_pages(vec![vec![LOCK_PATH]]);
        h.host.set_file(LOCK_PATH, "headsha", "last_update_commit: bbb\n");
        h.host.set_file(LOCK_PATH, "basesha", "last_update_commit: aaa\n");
        {
            let mut objects = h.blob.objects.lock().unwrap();
            objects.insert("aaa.tgz".to_string(), tgz(&[("x.png", png(30, 30, |_, _| Rgba([0, 0, 0, 255])))]));
            objects.insert("bbb.tgz".to_string(), tgz(&[("x.png", png(30, 30, |_, _| Rgba([255, 0, 0, 255])))]));
        }
        h.pipeline.handle_pull_request_event(&event()).await.unwrap();

        let outcome = h.pipeline.complete_check("headsha").await.unwrap();
        assert_eq!(outcome, CompleteCheckOutcome::Resolved);
        let last = h.host.last_check().unwrap();
        assert_eq!(last.conclusion, Some(CheckConclusion::Success));

        // Second resolution has nothing left to do.
        let outcome = h.pipeline.complete_check("headsha").await.unwrap();
        assert_eq!(outcome, CompleteCheckOutcome::AlreadyResolved);
    }

    #[tokio::test]
    async fn complete_check_for_unknown_commit() {
        let h = harness();
        let outcome = h.pipeline.complete_check("nope").await.unwrap();
        assert_eq!(outcome, CompleteCheckOutcome::UnknownCommit);
    }

    #[tokio::test]
    async fn rerun_skips_when_pull_request_closed() {
        let h = harness();
        h.host.set_pull_file_pages(vec![vec![LOCK_PATH]]);
        h.host.set_file(LOCK_PATH, "headsha", "last_update_commit: bbb\n");
        h.host.set_file(LOCK_PATH, "basesha", "last_update_commit: aaa\n");
        // Missing archives park the check in_progress.
        h.pipeline.handle_pull_request_event(&event()).await.unwrap();

        h.host.set_pull(PullRequestInfo {
            number: 12,
            state: "closed".to_string(),
            head_sha: "headsha".to_string(),
            base_sha: "basesha".to_string(),
        });

        let plan = h.pipeline.plan_rerun("headsha").await.unwrap();
        assert_eq!(plan, RerunPlan::Stale);
    }

    #[tokio::test]
    async fn rerun_skips_when_head_moved_on() {
        let h = harness();
        h.host.set_pull_file_pages(vec![vec![LOCK_PATH]]);
        h.host.set_file(LOCK_PATH, "headsha", "last_update_commit: bbb\n");
        h.host.set_file(LOCK_PATH, "basesha", "last_update_commit: aaa\n");
        h.pipeline.handle_pull_request_event(&event()).await.unwrap();

        h.host.set_pull(PullRequestInfo {
            number: 12,
            state: "open".to_string(),
            head_sha: "newershasum".to_string(),
            base_sha: "basesha".to_string(),
        });

        let plan = h.pipeline.plan_rerun("headsha").await.unwrap();
        assert_eq!(plan, RerunPlan::Stale);
    }

    #[tokio::test]
    async fn rerun_completes_once_snapshots_arrive() {
        let h = harness();
        h.host.set_pull_file_pages(vec![vec![LOCK_PATH]]);
        h.host.set_file(LOCK_PATH, "headsha", "last_update_commit: bbb\n");
        h.host.set_file(LOCK_PATH, "basesha", "last_update_commit: aaa\n");
        h.pipeline.handle_pull_request_event(&event()).await.unwrap();
        assert_eq!(
            h.host.last_check().unwrap().status,
            CheckStatus::InProgress
        );

        // CI finishes uploading identical corpora, then pings re-entry.
        {
            let mut objects = h.blob.objects.lock().unwrap();
            let archive = tgz(&[("x.png", png(20, 20, |_, _| Rgba([0, 0, 0, 255])))]);
            objects.insert("aaa.tgz".to_string(), archive.clone());
            objects.insert("bbb.tgz".to_string(), archive);
        }
        h.host.set_pull(PullRequestInfo {
            number: 12,
            state: "open".to_string(),
            head_sha: "headsha".to_string(),
            base_sha: "basesha".to_string(),
        });

        let plan = h.pipeline.plan_rerun("headsha").await.unwrap();
        let RerunPlan::Run(context) = plan else {
            panic!("expected a rerun, got {plan:?}");
        };
        h.pipeline.run_rerun(&context).await.unwrap();

        let last = h.host.last_check().unwrap();
        assert_eq!(last.status, CheckStatus::Completed);
        assert_eq!(last.conclusion, Some(CheckConclusion::Success));
    }

    #[tokio::test]
    async fn rerun_declines_after_completion() {
        let h = harness();
        h.host.set_pull_file_pages(vec![vec!["src/app.js"]]);
        h.pipeline.handle_pull_request_event(&event()).await.unwrap();

        let plan = h.pipeline.plan_rerun("headsha").await.unwrap();
        assert_eq!(plan, RerunPlan::CheckNotInProgress);
    }
}
