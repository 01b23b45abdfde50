//! Filesystem-backed storage client
//!
//! Objects live under a root directory, one file per key. Used by the CLI
//! and by tests that want real I/O without a cloud account.

use std::path::{Component, Path, PathBuf};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use url::Url;

use super::{PutOptions, PutResult, StorageClient};
use crate::error::UploadError;

/// Default write chunk (64KB); progress is reported once per chunk
const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Storage client writing objects below a local directory
#[derive(Debug, Clone)]
pub struct LocalDirStorage {
    root: PathBuf,
    chunk_size: usize,
}

impl LocalDirStorage {
    /// Open (and create if needed) the storage root
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        std::fs::create_dir_all(root)?;
        let root = root.canonicalize()?;
        Ok(Self {
            root,
            chunk_size: DEFAULT_CHUNK_SIZE,
        })
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a key to a path below the root, rejecting anything that escapes it
    pub fn object_path(&self, key: &str) -> Result<PathBuf, UploadError> {
        let relative = Path::new(key);
        let is_plain = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !is_plain {
            return Err(UploadError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }

    /// Write `data` chunk by chunk, reporting progress after each chunk
    async fn write_object(
        &self,
        mut file: tokio::fs::File,
        data: &Bytes,
        options: &PutOptions,
    ) -> Result<()> {
        let total = data.len() as u64;
        if data.is_empty() {
            options.report(0, 0)?;
        }

        let mut loaded = 0u64;
        for chunk in data.chunks(self.chunk_size) {
            file.write_all(chunk).await?;
            loaded += chunk.len() as u64;
            options.report(loaded, total)?;
        }
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl StorageClient for LocalDirStorage {
    async fn put(&self, key: &str, data: Bytes, options: PutOptions) -> Result<PutResult> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        debug!(
            "Writing {} bytes to {:?} (content type: {:?})",
            data.len(),
            path,
            options.content_type
        );

        let file = tokio::fs::File::create(&path).await?;
        if let Err(e) = self.write_object(file, &data, &options).await {
            // Partial objects are not left behind
            if let Err(remove_err) = tokio::fs::remove_file(&path).await {
                debug!("Failed to remove partial object {:?}: {}", path, remove_err);
            }
            return Err(e);
        }

        Ok(PutResult {
            key: key.to_string(),
        })
    }

    async fn get(&self, key: &str, _options: &Value) -> Result<String> {
        let path = self.object_path(key)?;
        if !tokio::fs::try_exists(&path).await? {
            return Err(anyhow!("Object not found: {}", key));
        }
        let url = Url::from_file_path(&path)
            .map_err(|_| anyhow!("Cannot build URL for {:?}", path))?;
        Ok(url.to_string())
    }
}
