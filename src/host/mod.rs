//! Host capability: the file queue and event bus the uploader reports to

pub mod memory;

pub use memory::{MemoryHost, NewFile, UploadSummary};

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;

use crate::error::SharedError;
use crate::i18n::Locale;
use crate::storage::PutResult;

/// A file queued in the host
#[derive(Debug, Clone, Serialize)]
pub struct UploadFile {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub mime_type: Option<String>,
    #[serde(skip)]
    pub data: Bytes,
    /// Set by the host when the file was invalidated before upload
    pub error: Option<String>,
}

impl UploadFile {
    pub fn new(id: impl Into<String>, name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            mime_type: None,
            data: data.into(),
            error: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// `preprocess-progress` payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreprocessProgress {
    pub mode: ProgressMode,
    pub message: String,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressMode {
    Determinate,
}

/// `upload-progress` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadProgress {
    pub uploader: String,
    pub bytes_uploaded: u64,
    pub bytes_total: u64,
}

/// `upload-success` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub body: PutResult,
    #[serde(rename = "uploadURL")]
    pub upload_url: String,
}

/// `upload-error` payload
#[derive(Debug, Clone)]
pub enum ErrorPayload {
    /// The failing operation's own error
    Raw(SharedError),
    /// Wrapped error: the object was stored but its URL lookup failed
    Body(SharedError),
}

impl ErrorPayload {
    pub fn error(&self) -> &anyhow::Error {
        match self {
            Self::Raw(e) | Self::Body(e) => e,
        }
    }
}

impl std::fmt::Display for ErrorPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Raw(e) => write!(f, "{}", e),
            Self::Body(e) => write!(f, "{{ body: {} }}", e),
        }
    }
}

/// Lifecycle events emitted to the host
#[derive(Debug, Clone)]
pub enum UploadEvent {
    PreprocessProgress {
        file: UploadFile,
        progress: PreprocessProgress,
    },
    PreprocessComplete {
        file: UploadFile,
    },
    UploadError {
        file: UploadFile,
        error: ErrorPayload,
    },
    UploadStarted {
        file: UploadFile,
    },
    UploadProgress {
        file: UploadFile,
        progress: UploadProgress,
    },
    UploadSuccess {
        file: UploadFile,
        response: UploadResponse,
    },
}

impl UploadEvent {
    /// Event name on the host bus
    pub fn name(&self) -> &'static str {
        match self {
            Self::PreprocessProgress { .. } => "preprocess-progress",
            Self::PreprocessComplete { .. } => "preprocess-complete",
            Self::UploadError { .. } => "upload-error",
            Self::UploadStarted { .. } => "upload-started",
            Self::UploadProgress { .. } => "upload-progress",
            Self::UploadSuccess { .. } => "upload-success",
        }
    }

    pub fn file(&self) -> &UploadFile {
        match self {
            Self::PreprocessProgress { file, .. }
            | Self::PreprocessComplete { file }
            | Self::UploadError { file, .. }
            | Self::UploadStarted { file }
            | Self::UploadProgress { file, .. }
            | Self::UploadSuccess { file, .. } => file,
        }
    }
}

/// Function the host invokes with the ids of files ready to upload
#[async_trait]
pub trait UploadHandler: Send + Sync {
    fn id(&self) -> &str;

    /// Upload every file; resolves once all of them have settled
    async fn handle_upload(&self, file_ids: &[String]);
}

/// The host owning the file queue and event bus
pub trait Host: Send + Sync {
    fn get_file(&self, id: &str) -> Option<UploadFile>;

    fn emit(&self, event: UploadEvent);

    fn log(&self, message: &str);

    fn add_uploader(&self, uploader: Arc<dyn UploadHandler>);

    /// Detach the uploader registered under `id`
    fn remove_uploader(&self, id: &str);

    /// Host-wide locale overrides
    fn locale(&self) -> Option<Locale>;
}
