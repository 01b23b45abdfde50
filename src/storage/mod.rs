//! Storage client capability consumed by the uploader

pub mod local;

pub use local::LocalDirStorage;

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::UploadError;

/// Bytes transferred so far for one object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    pub loaded: u64,
    pub total: u64,
}

/// Called by the storage client during a put. An error means the put must
/// stop and fail with that error.
pub type ProgressCallback = Arc<dyn Fn(TransferProgress) -> Result<(), UploadError> + Send + Sync>;

/// Options passed to `StorageClient::put`
#[derive(Clone, Default)]
pub struct PutOptions {
    pub content_type: Option<String>,
    pub progress: Option<ProgressCallback>,
}

impl PutOptions {
    /// Report progress to the caller, if it asked for it
    pub fn report(&self, loaded: u64, total: u64) -> Result<(), UploadError> {
        match &self.progress {
            Some(callback) => callback(TransferProgress { loaded, total }),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for PutOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PutOptions")
            .field("content_type", &self.content_type)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// Body returned by a successful put
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutResult {
    pub key: String,
}

/// Object storage used for the actual transfer
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Store `data` under `key`, calling `options.report` as bytes go out
    async fn put(&self, key: &str, data: Bytes, options: PutOptions) -> Result<PutResult>;

    /// Resolve a retrieval URL for a stored key; `options` are client specific
    async fn get(&self, key: &str, options: &Value) -> Result<String>;
}
