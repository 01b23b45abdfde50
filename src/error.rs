//! Error types for the upload pipeline

use std::sync::Arc;

use thiserror::Error;

/// Error from an injected collaborator, shareable across events and results
pub type SharedError = Arc<anyhow::Error>;

/// Failures produced while preparing or transferring a file
#[derive(Debug, Clone, Error)]
pub enum UploadError {
    #[error("file {0} is not registered with the host")]
    FileNotFound(String),

    /// Raised from the progress callback once the host no longer holds the file
    #[error("file {0} was removed from the host during upload")]
    FileRemoved(String),

    /// The host flagged the file before the upload started
    #[error("{0}")]
    Rejected(String),

    #[error("failed to get upload parameters: {0}")]
    Parameters(SharedError),

    #[error("storage put failed: {0}")]
    Put(SharedError),

    /// The object was stored but its retrieval URL could not be obtained
    #[error("object stored but URL lookup failed: {0}")]
    UrlLookup(SharedError),

    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl UploadError {
    /// Whether the object reached storage even though the upload failed
    pub fn object_stored(&self) -> bool {
        matches!(self, Self::UrlLookup(_))
    }
}
