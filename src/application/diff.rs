//! Diff engine: path-level change-set plus pairwise pixel comparison.

use crate::application::materialize::SnapshotTree;
use crate::domain::{CompareError, DiffRecord, DiffReport, PipelineError};
use crate::infra::compare::compare_images;
use std::path::{Path, PathBuf};

/// Differing-pixel count at or above which a pair of images is reported.
pub const PIXEL_DIFF_THRESHOLD: u64 = 300;

/// Compute the change-set between two snapshot trees.
///
/// Paths present in only one tree are reported by presence alone. Paths in
/// both trees are pixel-compared one at a time; running the comparisons
/// sequentially bounds memory and file-handle usage no matter how many
/// snapshots a corpus holds. A pair counts as different when its
/// differing-pixel count reaches `PIXEL_DIFF_THRESHOLD`; the boundary is
/// inclusive.
pub async fn diff_trees(
    base: &SnapshotTree,
    current: &SnapshotTree,
    output_dir: &Path,
) -> Result<DiffReport, PipelineError> {
    let rel_base = base.relative_paths()?;
    let rel_current = current.relative_paths()?;

    let not_in_current: Vec<DiffRecord> = rel_current
        .difference(&rel_base)
        .map(|rel| DiffRecord::new(current.absolute(rel), rel.clone()))
        .collect();
    let not_in_base: Vec<DiffRecord> = rel_base
        .difference(&rel_current)
        .map(|rel| DiffRecord::new(base.absolute(rel), rel.clone()))
        .collect();

    std::fs::create_dir_all(output_dir)?;

    let mut different = Vec::new();
    for rel in rel_base.intersection(&rel_current) {
        let artifact = artifact_path(output_dir, rel);
        if compare_pair(base.absolute(rel), current.absolute(rel), artifact.clone()).await? {
            different.push(DiffRecord::new(artifact, rel.clone()));
        }
    }

    Ok(DiffReport::new(different, not_in_current, not_in_base))
}

/// Compare one pair off the async reactor; write the artifact only when the
/// pair is reported.
async fn compare_pair(
    base: PathBuf,
    current: PathBuf,
    artifact: PathBuf,
) -> Result<bool, PipelineError> {
    let outcome = tokio::task::spawn_blocking(move || -> Result<bool, CompareError> {
        let comparison = compare_images(&base, &current)?;
        log::debug!(
            "compared {}: {} differing pixels",
            current.display(),
            comparison.differing_pixels
        );
        if comparison.differing_pixels >= PIXEL_DIFF_THRESHOLD {
            comparison.write_artifact(&artifact)?;
            return Ok(true);
        }
        Ok(false)
    })
    .await
    .map_err(|e| CompareError::Aborted(e.to_string()))??;
    Ok(outcome)
}

/// Unique artifact name: a short random prefix plus the snapshot's basename.
fn artifact_path(output_dir: &Path, relative: &str) -> PathBuf {
    let basename = relative.rsplit('/').next().unwrap_or(relative);
    let id = uuid::Uuid::new_v4().simple().to_string();
    output_dir.join(format!("{}-{basename}", &id[..8]))
}
