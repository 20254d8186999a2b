//! Snapshot materialization: archive retrieval and expansion into scratch
//! trees for one diff run.

use crate::domain::{BlobError, PipelineError};
use crate::infra::archive::unpack_tgz;
use crate::infra::blob::BlobStore;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// An expanded snapshot archive rooted in the run's scratch directory.
#[derive(Debug, Clone)]
pub struct SnapshotTree {
    root: PathBuf,
}

impl SnapshotTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Collect every file's tree-relative path, slash-prefixed, in sorted
    /// order. The leading slash is part of the display-path convention and
    /// carries through to blob keys and check-run captions.
    pub fn relative_paths(&self) -> std::io::Result<BTreeSet<String>> {
        let mut paths = BTreeSet::new();
        collect_files(&self.root, &self.root, &mut paths)?;
        Ok(paths)
    }

    /// Absolute location of a slash-prefixed relative path.
    pub fn absolute(&self, relative: &str) -> PathBuf {
        self.root.join(relative.trim_start_matches('/'))
    }
}

fn collect_files(
    root: &Path,
    dir: &Path,
    paths: &mut BTreeSet<String>,
) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            collect_files(root, &path, paths)?;
        } else {
            let relative = path
                .strip_prefix(root)
                .expect("walked path is under its root");
            paths.insert(format!("/{}", relative.display()));
        }
    }
    Ok(())
}

/// Fetches and expands both sides' snapshot archives.
pub struct Materializer {
    blob: Arc<dyn BlobStore>,
}

impl Materializer {
    pub fn new(blob: Arc<dyn BlobStore>) -> Self {
        Self { blob }
    }

    /// Expand the archives for both update commits into `scratch/base` and
    /// `scratch/current`. A missing archive is the expected
    /// snapshots-not-yet-uploaded condition and surfaces as
    /// `PipelineError::ArchiveNotFound`.
    pub async fn materialize(
        &self,
        base_update: &str,
        current_update: &str,
        scratch: &Path,
    ) -> Result<(SnapshotTree, SnapshotTree), PipelineError> {
        let current_tree = self
            .fetch_and_expand(current_update, &scratch.join("current"))
            .await?;
        let base_tree = self
            .fetch_and_expand(base_update, &scratch.join("base"))
            .await?;
        Ok((base_tree, current_tree))
    }

    async fn fetch_and_expand(
        &self,
        update_commit: &str,
        dest: &Path,
    ) -> Result<SnapshotTree, PipelineError> {
        let key = format!("{update_commit}.tgz");
        log::info!("fetching snapshot archive {key}");
        let bytes = self.blob.get(&key).await.map_err(|e| match e {
            BlobError::NotFound => PipelineError::ArchiveNotFound { key: key.clone() },
            other => PipelineError::Blob(other),
        })?;

        // A retried run may leave a stale expansion behind.
        if dest.exists() {
            std::fs::remove_dir_all(dest)?;
        }
        unpack_tgz(&bytes, dest)?;
        Ok(SnapshotTree::new(dest))
    }
}
