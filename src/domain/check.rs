//! Check-run domain types and the per-commit bookkeeping record.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a check run on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Queued,
    InProgress,
    Completed,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CheckStatus::Queued => "queued",
            CheckStatus::InProgress => "in_progress",
            CheckStatus::Completed => "completed",
        };
        f.write_str(s)
    }
}

impl FromStr for CheckStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(CheckStatus::Queued),
            "in_progress" => Ok(CheckStatus::InProgress),
            "completed" => Ok(CheckStatus::Completed),
            other => Err(format!("unknown check status: {other}")),
        }
    }
}

/// Terminal conclusion of a completed check run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckConclusion {
    Success,
    ActionRequired,
    Neutral,
}

impl fmt::Display for CheckConclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CheckConclusion::Success => "success",
            CheckConclusion::ActionRequired => "action_required",
            CheckConclusion::Neutral => "neutral",
        };
        f.write_str(s)
    }
}

impl FromStr for CheckConclusion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(CheckConclusion::Success),
            "action_required" => Ok(CheckConclusion::ActionRequired),
            "neutral" => Ok(CheckConclusion::Neutral),
            other => Err(format!("unknown check conclusion: {other}")),
        }
    }
}

/// One image attached to a check-run output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckImage {
    pub alt: String,
    pub image_url: String,
    pub caption: String,
}

/// Title/summary block shown on the check run, with optional image attachments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckOutput {
    pub title: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<CheckImage>,
}

impl CheckOutput {
    pub fn text(title: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            summary: summary.into(),
            images: Vec::new(),
        }
    }

    pub fn has_images(&self) -> bool {
        !self.images.is_empty()
    }
}

/// A requested check-run mutation, before the create-vs-update decision.
#[derive(Debug, Clone)]
pub struct CheckRequest {
    pub owner: String,
    pub repo: String,
    pub head_sha: String,
    pub status: CheckStatus,
    pub conclusion: Option<CheckConclusion>,
    pub output: Option<CheckOutput>,
    /// Stamped by the reconciler when `status` is `completed`.
    pub completed_at: Option<String>,
}

impl CheckRequest {
    pub fn new(owner: &str, repo: &str, head_sha: &str, status: CheckStatus) -> Self {
        Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            head_sha: head_sha.to_string(),
            status,
            conclusion: None,
            output: None,
            completed_at: None,
        }
    }

    pub fn with_conclusion(mut self, conclusion: CheckConclusion) -> Self {
        self.conclusion = Some(conclusion);
        self
    }

    pub fn with_output(mut self, output: CheckOutput) -> Self {
        self.output = Some(output);
        self
    }

    pub fn carries_images(&self) -> bool {
        self.output.as_ref().is_some_and(CheckOutput::has_images)
    }
}

/// The host's view of a check run after a create or update call.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckRun {
    pub id: u64,
    pub status: CheckStatus,
    pub conclusion: Option<CheckConclusion>,
}

/// Per-commit bookkeeping, persisted as a hash in the key-value store.
///
/// Fields arrive through independent merge writes, so any of them may be
/// absent at a given read. `report_id` stays absent until the first check
/// run has been created for the commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitRecord {
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub installation_id: Option<u64>,
    pub report_id: Option<u64>,
    pub report_status: Option<CheckStatus>,
    pub report_conclusion: Option<CheckConclusion>,
    /// Whether the last published check-run payload carried images. `None`
    /// when no reconciliation has written the field yet.
    pub has_images: Option<bool>,
}

pub const F_OWNER: &str = "owner";
pub const F_REPO: &str = "repo";
pub const F_INSTALLATION_ID: &str = "installation_id";
pub const F_REPORT_ID: &str = "report_id";
pub const F_REPORT_STATUS: &str = "report_status";
pub const F_REPORT_CONCLUSION: &str = "report_conclusion";
pub const F_HAS_IMAGES: &str = "has_images";

impl CommitRecord {
    /// Rebuild a record from a stored hash. An empty hash means the commit
    /// has never been seen and yields `None`.
    pub fn from_hash(fields: &HashMap<String, String>) -> Option<Self> {
        if fields.is_empty() {
            return None;
        }
        Some(Self {
            owner: fields.get(F_OWNER).cloned(),
            repo: fields.get(F_REPO).cloned(),
            installation_id: fields.get(F_INSTALLATION_ID).and_then(|v| v.parse().ok()),
            report_id: fields.get(F_REPORT_ID).and_then(|v| v.parse().ok()),
            report_status: fields.get(F_REPORT_STATUS).and_then(|v| v.parse().ok()),
            report_conclusion: fields
                .get(F_REPORT_CONCLUSION)
                .and_then(|v| v.parse().ok()),
            has_images: fields.get(F_HAS_IMAGES).map(|v| v == "true"),
        })
    }

    /// Fields written when a pull-request event first identifies the commit.
    pub fn meta_fields(
        owner: &str,
        repo: &str,
        installation_id: Option<u64>,
    ) -> Vec<(String, String)> {
        let mut fields = vec![
            (F_OWNER.to_string(), owner.to_string()),
            (F_REPO.to_string(), repo.to_string()),
        ];
        if let Some(id) = installation_id {
            fields.push((F_INSTALLATION_ID.to_string(), id.to_string()));
        }
        fields
    }

    /// Fields written back after every reconciliation step.
    pub fn report_fields(run: &CheckRun, has_images: bool) -> Vec<(String, String)> {
        let mut fields = vec![
            (F_REPORT_ID.to_string(), run.id.to_string()),
            (F_REPORT_STATUS.to_string(), run.status.to_string()),
            (F_HAS_IMAGES.to_string(), has_images.to_string()),
        ];
        if let Some(conclusion) = run.conclusion {
            fields.push((F_REPORT_CONCLUSION.to_string(), conclusion.to_string()));
        }
        fields
    }

    pub fn owner_repo(&self) -> Option<(&str, &str)> {
        match (self.owner.as_deref(), self.repo.as_deref()) {
            (Some(owner), Some(repo)) => Some((owner, repo)),
            _ => None,
        }
    }
}
