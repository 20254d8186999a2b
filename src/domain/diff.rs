//! Snapshot diff report types.

use std::path::PathBuf;

/// One path-level outcome in a diff report: an added, removed, or
/// pixel-different image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffRecord {
    /// Absolute location of the artifact to publish (the composed diff image
    /// for pixel differences, the snapshot itself for added/removed paths).
    pub file_path: PathBuf,
    /// Tree-relative path with a leading slash. Used verbatim as the blob key
    /// suffix and as the host-facing caption.
    pub display_path: String,
}

impl DiffRecord {
    pub fn new(file_path: impl Into<PathBuf>, display_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            display_path: display_path.into(),
        }
    }
}

/// The change-set between two snapshot trees.
///
/// `total` always equals `different.len() + not_in_base.len() +
/// not_in_current.len()`, and `all` lists `different`, then `not_in_current`,
/// then `not_in_base`, in that order. Both are established by the constructor
/// rather than recomputed by callers.
#[derive(Debug, Clone, Default)]
pub struct DiffReport {
    pub total: usize,
    pub all: Vec<DiffRecord>,
    pub different: Vec<DiffRecord>,
    /// Paths present only in the base tree (images the change removes).
    pub not_in_base: Vec<DiffRecord>,
    /// Paths present only in the current tree (images the change adds).
    pub not_in_current: Vec<DiffRecord>,
}

impl DiffReport {
    pub fn new(
        different: Vec<DiffRecord>,
        not_in_current: Vec<DiffRecord>,
        not_in_base: Vec<DiffRecord>,
    ) -> Self {
        let total = different.len() + not_in_base.len() + not_in_current.len();
        let mut all = Vec::with_capacity(total);
        all.extend(different.iter().cloned());
        all.extend(not_in_current.iter().cloned());
        all.extend(not_in_base.iter().cloned());
        Self {
            total,
            all,
            different,
            not_in_base,
            not_in_current,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(name: &str) -> DiffRecord {
        DiffRecord::new(format!("/tmp/{name}"), format!("/{name}"))
    }

    #[test]
    fn total_matches_component_lengths() {
        let report = DiffReport::new(
            vec![rec("a.png"), rec("b.png")],
            vec![rec("new.png")],
            vec![rec("gone.png")],
        );
        assert_eq!(report.total, 4);
        assert_eq!(
            report.total,
            report.different.len() + report.not_in_base.len() + report.not_in_current.len()
        );
    }

    #[test]
    fn all_preserves_display_order() {
        let report = DiffReport::new(vec![rec("diff.png")], vec![rec("new.png")], vec![rec("gone.png")]);
        let order: Vec<&str> = report.all.iter().map(|r| r.display_path.as_str()).collect();
        assert_eq!(order, vec!["/diff.png", "/new.png", "/gone.png"]);
    }

    #[test]
    fn empty_report_has_no_records() {
        let report = DiffReport::empty();
        assert!(report.is_empty());
        assert_eq!(report.total, 0);
        assert!(report.all.is_empty());
    }
}
