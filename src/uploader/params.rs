//! Per-file upload parameters and the providers that produce them

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::host::UploadFile;

/// Parameters for one file's transfer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadParameters {
    /// Object key the file is stored under
    pub filename: String,
    /// Provider-specific extras, kept as-is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UploadParameters {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            extra: Map::new(),
        }
    }
}

/// Parameters merged with the id of the file they belong to
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedUpload {
    pub id: String,
    pub params: UploadParameters,
}

/// Supplies upload parameters for each file
#[async_trait]
pub trait ParameterProvider: Send + Sync {
    async fn get_upload_parameters(&self, file: &UploadFile) -> Result<UploadParameters>;

    /// Hook run on every successful lookup; passes parameters through unchanged by default
    fn validate_parameters(
        &self,
        _file: &UploadFile,
        params: UploadParameters,
    ) -> Result<UploadParameters> {
        Ok(params)
    }
}

/// Default provider: `<epoch millis>-<file name>`
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampParameters;

#[async_trait]
impl ParameterProvider for TimestampParameters {
    async fn get_upload_parameters(&self, file: &UploadFile) -> Result<UploadParameters> {
        Ok(UploadParameters::new(format!(
            "{}-{}",
            Utc::now().timestamp_millis(),
            file.name
        )))
    }
}

/// Provider backed by an async closure
pub struct FnParameters<F>(F);

#[async_trait]
impl<F, Fut> ParameterProvider for FnParameters<F>
where
    F: Fn(UploadFile) -> Fut + Send + Sync,
    Fut: Future<Output = Result<UploadParameters>> + Send + 'static,
{
    async fn get_upload_parameters(&self, file: &UploadFile) -> Result<UploadParameters> {
        (self.0)(file.clone()).await
    }
}

/// Wrap an async closure as a shared parameter provider
pub fn provider_fn<F, Fut>(f: F) -> Arc<dyn ParameterProvider>
where
    F: Fn(UploadFile) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<UploadParameters>> + Send + 'static,
{
    Arc::new(FnParameters(f))
}
