//! Uploader - hands queued files to the storage client and reports back to the host
//!
//! A batch runs in three phases: parameters are fetched for every file,
//! each file is put into storage and its URL resolved, and the per-file
//! outcomes are settled without letting one failure fail the batch.

mod params;

pub use params::{
    provider_fn, FnParameters, ParameterProvider, PreparedUpload, TimestampParameters,
    UploadParameters,
};

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use futures::future::{self, BoxFuture, FutureExt};
use tracing::{debug, info, warn};

use crate::config::{Config, UploaderOptions};
use crate::error::UploadError;
use crate::host::{
    ErrorPayload, Host, PreprocessProgress, ProgressMode, UploadEvent, UploadFile, UploadHandler,
    UploadProgress, UploadResponse,
};
use crate::i18n::{Locale, Translator, PREPARING_UPLOAD};
use crate::limit::RateLimiter;
use crate::settle::{settle, Settled, Settlement};
use crate::storage::{ProgressCallback, PutOptions, StorageClient, TransferProgress};

/// Human-readable uploader title
pub const UPLOADER_TITLE: &str = "Object Storage";

/// Role reported to the host
pub const UPLOADER_TYPE: &str = "uploader";

/// Outcome of one file in a batch
pub type FileSettlement = Settled<UploadResponse, UploadError>;

/// Uploader bound to one host and one storage client
pub struct Uploader {
    host: Arc<dyn Host>,
    config: Arc<Config>,
    translator: Translator,
    limiter: RateLimiter,
}

impl Uploader {
    /// Build an uploader for `host` using `storage` for transfers
    pub fn new(
        host: Arc<dyn Host>,
        storage: Arc<dyn StorageClient>,
        options: UploaderOptions,
    ) -> Result<Arc<Self>> {
        let config = Config::new(storage, options)?;
        Ok(Self::from_config(host, config))
    }

    pub fn from_config(host: Arc<dyn Host>, config: Arc<Config>) -> Arc<Self> {
        let locales = [Some(Locale::default_strings()), host.locale(), config.locale.clone()];
        let translator = Translator::new(locales.into_iter().flatten());
        let limiter = RateLimiter::new(config.limit);

        info!(
            "Uploader {} initialized: limit={}",
            config.id,
            if config.limit == 0 {
                "unlimited".to_string()
            } else {
                config.limit.to_string()
            }
        );

        Arc::new(Self {
            host,
            config,
            translator,
            limiter,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn title(&self) -> &'static str {
        UPLOADER_TITLE
    }

    pub fn kind(&self) -> &'static str {
        UPLOADER_TYPE
    }

    /// Look up a message across default, host and uploader locales
    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Register with the host. The host keeps a strong reference until `uninstall`.
    pub fn install(self: &Arc<Self>) {
        self.host.add_uploader(self.clone());
    }

    pub fn uninstall(&self) {
        self.host.remove_uploader(&self.config.id);
    }

    fn preprocess_event(&self, file: UploadFile, value: f64) -> UploadEvent {
        UploadEvent::PreprocessProgress {
            file,
            progress: PreprocessProgress {
                mode: ProgressMode::Determinate,
                message: self.translator.translate(PREPARING_UPLOAD),
                value,
            },
        }
    }

    /// Phase 1: fetch parameters for every file.
    ///
    /// The result has one entry per input id, in input order; `None` marks a
    /// file whose lookup failed (already reported as `upload-error`) or that
    /// the host does not know. Every file known at the start gets exactly one
    /// `preprocess-complete`, even if the host drops it mid-lookup.
    pub async fn prepare_upload(&self, file_ids: &[String]) -> Vec<Option<PreparedUpload>> {
        let files: Vec<Option<UploadFile>> = file_ids
            .iter()
            .map(|id| {
                let file = self.host.get_file(id);
                match &file {
                    Some(file) => self.host.emit(self.preprocess_event(file.clone(), 0.0)),
                    None => warn!("Skipping unknown file {}", id),
                }
                file
            })
            .collect();

        let provider = &self.config.parameter_provider;
        let lookups = files.iter().flatten().map(|file| async move {
            let result = self
                .limiter
                .run(provider.get_upload_parameters(file))
                .await
                .and_then(|params| provider.validate_parameters(file, params));

            match result {
                Ok(params) => {
                    self.host.emit(self.preprocess_event(file.clone(), 1.0));
                    Some(PreparedUpload {
                        id: file.id.clone(),
                        params,
                    })
                }
                Err(e) => {
                    warn!("Failed to get upload parameters for {}: {}", file.id, e);
                    self.host.emit(UploadEvent::UploadError {
                        file: file.clone(),
                        error: ErrorPayload::Raw(Arc::new(e)),
                    });
                    None
                }
            }
        });
        let mut looked_up = future::join_all(lookups).await.into_iter();

        let mut prepared = Vec::with_capacity(file_ids.len());
        for file in files {
            match file {
                Some(file) => {
                    self.host.emit(UploadEvent::PreprocessComplete { file });
                    prepared.push(looked_up.next().flatten());
                }
                None => prepared.push(None),
            }
        }
        prepared
    }

    /// Progress reporter for one file's put; fails once the host drops the file
    fn progress_callback(&self, file: &UploadFile) -> ProgressCallback {
        let host = self.host.clone();
        let file = file.clone();
        let uploader = self.config.id.clone();

        Arc::new(move |progress: TransferProgress| {
            if host.get_file(&file.id).is_none() {
                return Err(UploadError::FileRemoved(file.id.clone()));
            }
            host.emit(UploadEvent::UploadProgress {
                file: file.clone(),
                progress: UploadProgress {
                    uploader: uploader.clone(),
                    bytes_uploaded: progress.loaded,
                    bytes_total: progress.total,
                },
            });
            Ok(())
        })
    }

    /// Phase 2: put one file and resolve its retrieval URL.
    ///
    /// Every failure is emitted as `upload-error` before it is returned.
    pub async fn handle_file_upload(
        &self,
        filename: &str,
        file: &UploadFile,
        position: usize,
        total: usize,
    ) -> Result<UploadResponse, UploadError> {
        self.host.log(&format!(
            "[{}] Uploading {} of {}",
            self.config.id, position, total
        ));

        let options = PutOptions {
            content_type: file.mime_type.clone(),
            progress: Some(self.progress_callback(file)),
        };

        let body = match self
            .config
            .storage
            .put(filename, file.data.clone(), options)
            .await
        {
            Ok(body) => body,
            Err(e) => {
                warn!("Upload of {} failed: {}", file.id, e);
                let e = Arc::new(e);
                self.host.emit(UploadEvent::UploadError {
                    file: file.clone(),
                    error: ErrorPayload::Raw(e.clone()),
                });
                return Err(UploadError::Put(e));
            }
        };

        match self
            .config
            .storage
            .get(&body.key, &self.config.get_options)
            .await
        {
            Ok(upload_url) => {
                debug!("Uploaded {} as {}", file.id, body.key);
                let response = UploadResponse { body, upload_url };
                self.host.emit(UploadEvent::UploadSuccess {
                    file: file.clone(),
                    response: response.clone(),
                });
                Ok(response)
            }
            Err(e) => {
                warn!("Stored {} but URL lookup failed: {}", body.key, e);
                let e = Arc::new(e);
                self.host.emit(UploadEvent::UploadError {
                    file: file.clone(),
                    error: ErrorPayload::Body(e.clone()),
                });
                Err(UploadError::UrlLookup(e))
            }
        }
    }

    /// Phase 3: prepare, transfer and settle a batch, returning one outcome
    /// per prepared file in order.
    pub async fn upload_batch(&self, file_ids: &[String]) -> Vec<FileSettlement> {
        if file_ids.is_empty() {
            self.host
                .log(&format!("[{}] No files to upload!", self.config.id));
            return Vec::new();
        }

        self.host.log(&format!("[{}] Uploading...", self.config.id));

        let prepared: Vec<PreparedUpload> = self
            .prepare_upload(file_ids)
            .await
            .into_iter()
            .flatten()
            .collect();
        let total = prepared.len();

        // upload-started goes out while building the actions, so files queued
        // behind the limit are already marked started
        let actions: Vec<BoxFuture<'_, Result<UploadResponse, UploadError>>> = prepared
            .into_iter()
            .enumerate()
            .map(|(index, upload)| match self.host.get_file(&upload.id) {
                None => future::ready(Err(UploadError::FileNotFound(upload.id))).boxed(),
                Some(file) => match file.error.clone() {
                    Some(error) if !error.is_empty() => {
                        future::ready(Err(UploadError::Rejected(error))).boxed()
                    }
                    _ => {
                        self.host
                            .emit(UploadEvent::UploadStarted { file: file.clone() });
                        async move {
                            self.handle_file_upload(
                                &upload.params.filename,
                                &file,
                                index + 1,
                                total,
                            )
                            .await
                        }
                        .boxed()
                    }
                },
            })
            .collect();

        settle(actions.into_iter().map(|action| self.limiter.run(action))).await
    }
}

#[async_trait]
impl UploadHandler for Uploader {
    fn id(&self) -> &str {
        &self.config.id
    }

    async fn handle_upload(&self, file_ids: &[String]) {
        let outcomes = self.upload_batch(file_ids).await;
        let settlement: Settlement<_, _> = outcomes.into_iter().collect();
        debug!(
            "Batch settled: {} fulfilled, {} rejected",
            settlement.successful.len(),
            settlement.failed.len()
        );
    }
}
