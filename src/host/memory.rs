//! In-process host: file registry, event log and uploader registry

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{Host, UploadEvent, UploadFile, UploadHandler};
use crate::i18n::Locale;

/// File contents to queue
#[derive(Debug, Clone)]
pub struct NewFile {
    pub name: String,
    pub mime_type: Option<String>,
    pub data: Bytes,
}

impl NewFile {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: None,
            data: data.into(),
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

/// Result of `MemoryHost::upload`
#[derive(Debug, Clone, Default, Serialize)]
pub struct UploadSummary {
    pub successful: Vec<String>,
    pub failed: Vec<String>,
}

#[derive(Debug, Clone)]
enum FileOutcome {
    Uploaded(String),
    Failed(String),
}

#[derive(Default)]
struct State {
    order: Vec<String>,
    files: HashMap<String, UploadFile>,
    outcomes: HashMap<String, FileOutcome>,
    events: Vec<UploadEvent>,
    logs: Vec<String>,
    uploaders: Vec<Arc<dyn UploadHandler>>,
}

/// Host that keeps everything in memory
#[derive(Default)]
pub struct MemoryHost {
    state: Mutex<State>,
    locale: Option<Locale>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_locale(locale: Locale) -> Self {
        Self {
            state: Mutex::default(),
            locale: Some(locale),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // A panic while holding the lock leaves plain data behind; keep going
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue a file under a fresh id
    pub fn add_file(&self, file: NewFile) -> String {
        let id = format!("file-{}", Uuid::new_v4());
        let upload_file = UploadFile {
            id: id.clone(),
            name: file.name,
            mime_type: file.mime_type,
            data: file.data,
            error: None,
        };
        self.insert_file(upload_file);
        id
    }

    /// Queue a file with a caller-chosen id, replacing any file with that id
    pub fn insert_file(&self, file: UploadFile) {
        let mut state = self.state();
        if !state.files.contains_key(&file.id) {
            state.order.push(file.id.clone());
        }
        state.outcomes.remove(&file.id);
        state.files.insert(file.id.clone(), file);
    }

    pub fn remove_file(&self, id: &str) -> Option<UploadFile> {
        let mut state = self.state();
        state.order.retain(|existing| existing != id);
        state.outcomes.remove(id);
        state.files.remove(id)
    }

    /// Flag a queued file as invalid; it will be rejected without a transfer
    pub fn set_file_error(&self, id: &str, error: impl Into<String>) -> bool {
        match self.state().files.get_mut(id) {
            Some(file) => {
                file.error = Some(error.into());
                true
            }
            None => false,
        }
    }

    /// Ids of every queued file, in insertion order
    pub fn file_ids(&self) -> Vec<String> {
        self.state().order.clone()
    }

    pub fn events(&self) -> Vec<UploadEvent> {
        self.state().events.clone()
    }

    /// Names of emitted events, in order
    pub fn event_names(&self) -> Vec<&'static str> {
        self.state().events.iter().map(UploadEvent::name).collect()
    }

    /// Events emitted for one file, in order
    pub fn events_for(&self, id: &str) -> Vec<UploadEvent> {
        self.state()
            .events
            .iter()
            .filter(|e| e.file().id == id)
            .cloned()
            .collect()
    }

    pub fn clear_events(&self) {
        self.state().events.clear();
    }

    pub fn logs(&self) -> Vec<String> {
        self.state().logs.clone()
    }

    pub fn uploader_ids(&self) -> Vec<String> {
        self.state()
            .uploaders
            .iter()
            .map(|u| u.id().to_string())
            .collect()
    }

    /// Retrieval URL of an uploaded file
    pub fn upload_url(&self, id: &str) -> Option<String> {
        match self.state().outcomes.get(id) {
            Some(FileOutcome::Uploaded(url)) => Some(url.clone()),
            _ => None,
        }
    }

    /// Last error reported for a file
    pub fn upload_error(&self, id: &str) -> Option<String> {
        match self.state().outcomes.get(id) {
            Some(FileOutcome::Failed(error)) => Some(error.clone()),
            _ => None,
        }
    }

    /// Run every installed uploader over the files not uploaded yet
    pub async fn upload(&self) -> UploadSummary {
        let (pending, uploaders) = {
            let state = self.state();
            let pending: Vec<String> = state
                .order
                .iter()
                .filter(|id| !matches!(state.outcomes.get(*id), Some(FileOutcome::Uploaded(_))))
                .cloned()
                .collect();
            (pending, state.uploaders.clone())
        };

        if uploaders.is_empty() {
            warn!("No uploaders installed, nothing will be transferred");
        }

        for uploader in &uploaders {
            debug!("Running uploader {} over {} files", uploader.id(), pending.len());
            uploader.handle_upload(&pending).await;
        }

        let state = self.state();
        let mut summary = UploadSummary::default();
        for id in pending {
            match state.outcomes.get(&id) {
                Some(FileOutcome::Uploaded(_)) => summary.successful.push(id),
                _ => summary.failed.push(id),
            }
        }
        info!(
            "Upload complete: {} successful, {} failed",
            summary.successful.len(),
            summary.failed.len()
        );
        summary
    }
}

impl Host for MemoryHost {
    fn get_file(&self, id: &str) -> Option<UploadFile> {
        self.state().files.get(id).cloned()
    }

    fn emit(&self, event: UploadEvent) {
        let mut state = self.state();
        let id = event.file().id.clone();
        match &event {
            UploadEvent::UploadSuccess { response, .. } => {
                state
                    .outcomes
                    .insert(id, FileOutcome::Uploaded(response.upload_url.clone()));
            }
            UploadEvent::UploadError { error, .. } => {
                state
                    .outcomes
                    .insert(id, FileOutcome::Failed(error.to_string()));
            }
            _ => {}
        }
        state.events.push(event);
    }

    fn log(&self, message: &str) {
        debug!("{}", message);
        self.state().logs.push(message.to_string());
    }

    fn add_uploader(&self, uploader: Arc<dyn UploadHandler>) {
        self.state().uploaders.push(uploader);
    }

    fn remove_uploader(&self, id: &str) {
        self.state().uploaders.retain(|u| u.id() != id);
    }

    fn locale(&self) -> Option<Locale> {
        self.locale.clone()
    }
}
