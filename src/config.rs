//! Configuration module - uploader options and defaults

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::UploadError;
use crate::i18n::Locale;
use crate::storage::StorageClient;
use crate::uploader::{ParameterProvider, TimestampParameters};

/// Default uploader id, used in log markers and progress payloads
pub const DEFAULT_UPLOADER_ID: &str = "StorageUploader";

/// Optional settings for `Config::new()`; unset fields take defaults
#[derive(Clone, Default)]
pub struct UploaderOptions {
    pub id: Option<String>,
    /// Maximum concurrent operations; `0` = unlimited
    pub limit: Option<usize>,
    pub get_upload_parameters: Option<Arc<dyn ParameterProvider>>,
    /// Forwarded verbatim to `StorageClient::get`
    pub get_options: Option<Value>,
    /// Uploader-specific message overrides
    pub locale: Option<Locale>,
}

/// Resolved uploader configuration
#[derive(Clone)]
pub struct Config {
    pub id: String,
    pub limit: usize,
    pub storage: Arc<dyn StorageClient>,
    pub parameter_provider: Arc<dyn ParameterProvider>,
    pub get_options: Value,
    pub locale: Option<Locale>,
}

impl Config {
    /// Merge `options` over the defaults
    pub fn new(storage: Arc<dyn StorageClient>, options: UploaderOptions) -> Result<Arc<Self>> {
        let id = options
            .id
            .map(|id| id.trim().to_string())
            .unwrap_or_else(|| DEFAULT_UPLOADER_ID.to_string());

        if id.is_empty() {
            return Err(
                UploadError::InvalidConfig("uploader id cannot be empty".to_string()).into(),
            );
        }

        Ok(Arc::new(Self {
            id,
            limit: options.limit.unwrap_or(0),
            storage,
            parameter_provider: options
                .get_upload_parameters
                .unwrap_or_else(|| Arc::new(TimestampParameters)),
            get_options: options.get_options.unwrap_or_else(default_get_options),
            locale: options.locale,
        }))
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("id", &self.id)
            .field("limit", &self.limit)
            .field("get_options", &self.get_options)
            .field("locale", &self.locale)
            .finish_non_exhaustive()
    }
}

/// Options accepted from a JSON config file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfigFile {
    pub id: Option<String>,
    pub limit: Option<usize>,
    pub get_options: Option<Value>,
    pub locale: Option<Locale>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        Self::from_json(&text).with_context(|| format!("Invalid config file {:?}", path))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn into_options(self) -> UploaderOptions {
        UploaderOptions {
            id: self.id,
            limit: self.limit,
            get_upload_parameters: None,
            get_options: self.get_options,
            locale: self.locale,
        }
    }
}

/// `get` options used when none are configured
fn default_get_options() -> Value {
    json!({ "download": false })
}
