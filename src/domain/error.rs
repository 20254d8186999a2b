//! Error taxonomy for the snapshot-diff pipeline.
//!
//! Each external collaborator surfaces a closed error-kind enum so the
//! orchestrator can switch on outcomes exhaustively instead of probing
//! status strings.

use thiserror::Error;

/// Errors from the source-control host API.
#[derive(Debug, Error)]
pub enum HostError {
    /// The requested resource does not exist at the given ref.
    #[error("resource not found on host")]
    NotFound,

    #[error("host api error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("host transport failure: {0}")]
    Transport(#[source] anyhow::Error),

    #[error("unexpected host response: {0}")]
    Decode(String),
}

/// Errors from the blob store.
#[derive(Debug, Error)]
pub enum BlobError {
    /// The addressed object is absent. For snapshot archives this is an
    /// expected condition, not a failure.
    #[error("object not found in blob store")]
    NotFound,

    #[error("blob store error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("blob store transport failure: {0}")]
    Transport(#[source] anyhow::Error),
}

/// Errors from the key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key-value store io: {0}")]
    Io(#[from] std::io::Error),

    #[error("key-value store protocol violation: {0}")]
    Protocol(String),

    #[error("key-value store rejected command: {0}")]
    Server(String),
}

/// Lock-file parsing failures. Fatal to the current run.
#[derive(Debug, Error)]
pub enum LockFileError {
    #[error("malformed lock file: {0}")]
    Malformed(String),
}

/// Pixel-comparison failures. Fatal to the current run.
#[derive(Debug, Error)]
pub enum CompareError {
    #[error("failed to load image {path}: {source}")]
    Image {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to write diff artifact {path}: {source}")]
    Artifact {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("comparison task aborted: {0}")]
    Aborted(String),
}

/// Archive expansion failures.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to expand snapshot archive: {0}")]
    Expand(#[from] std::io::Error),
}

/// Umbrella error for one pipeline run.
///
/// `LockFileNotFound` and `ArchiveNotFound` are the two conditions the
/// orchestrator resolves to a status transition instead of an abort.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("lock file not found at ref")]
    LockFileNotFound,

    #[error("snapshot archive not found: {key}")]
    ArchiveNotFound { key: String },

    #[error(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    Blob(#[from] BlobError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    LockFile(#[from] LockFileError),

    #[error(transparent)]
    Compare(#[from] CompareError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("scratch tree io: {0}")]
    Scratch(#[from] std::io::Error),
}
