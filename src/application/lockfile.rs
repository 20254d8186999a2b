//! Lock-file resolution.
//!
//! The lock file is YAML tracked in the repository whose `last_update_commit`
//! field records the commit that last refreshed the snapshot corpus. Archives
//! are addressed by that commit, never by the pull request's own shas.

use crate::domain::LockFileError;
use serde::Deserialize;

/// Result of comparing the two sides' lock files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Both texts are byte-identical; no archives need fetching.
    Unchanged,
    Changed {
        base_update: String,
        current_update: String,
    },
}

#[derive(Deserialize)]
struct LockFile {
    last_update_commit: String,
}

/// Extract the snapshot-update commit from each side's lock file.
///
/// Byte-identical inputs short-circuit to `Unchanged` before any parsing;
/// most pull requests do not touch the lock file.
pub fn resolve_update_commits(
    base_text: &str,
    current_text: &str,
) -> Result<Resolution, LockFileError> {
    if base_text == current_text {
        return Ok(Resolution::Unchanged);
    }
    Ok(Resolution::Changed {
        base_update: last_update_commit(base_text)?,
        current_update: last_update_commit(current_text)?,
    })
}

fn last_update_commit(text: &str) -> Result<String, LockFileError> {
    let lock: LockFile =
        serde_yaml::from_str(text).map_err(|e| LockFileError::Malformed(e.to_string()))?;
    Ok(lock.last_update_commit)
}
