//! Shared test doubles

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

use storage_uploader::host::UploadFile;
use storage_uploader::storage::{PutOptions, PutResult, StorageClient};
use storage_uploader::{ParameterProvider, UploadParameters};

/// Hook run at the start of every put, with the key
pub type PutHook = Box<dyn Fn(&str) + Send + Sync>;

/// Scripted storage client that tracks how many calls are outstanding
pub struct MockStorage {
    delay: Duration,
    fail_put: HashSet<String>,
    fail_get: HashSet<String>,
    on_put: Option<PutHook>,
    current: AtomicUsize,
    peak: AtomicUsize,
    puts: Mutex<Vec<String>>,
    gets: Mutex<Vec<(String, Value)>>,
    content_types: Mutex<Vec<Option<String>>>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self {
            delay: Duration::from_millis(0),
            fail_put: HashSet::new(),
            fail_get: HashSet::new(),
            on_put: None,
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            puts: Mutex::new(Vec::new()),
            gets: Mutex::new(Vec::new()),
            content_types: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail the put for this key with `network`
    pub fn failing_put(mut self, key: &str) -> Self {
        self.fail_put.insert(key.to_string());
        self
    }

    /// Fail the URL lookup for this key
    pub fn failing_get(mut self, key: &str) -> Self {
        self.fail_get.insert(key.to_string());
        self
    }

    pub fn on_put(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_put = Some(Box::new(hook));
        self
    }

    /// Most put/get calls ever outstanding at once
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn puts(&self) -> Vec<String> {
        self.puts.lock().unwrap().clone()
    }

    pub fn gets(&self) -> Vec<(String, Value)> {
        self.gets.lock().unwrap().clone()
    }

    pub fn content_types(&self) -> Vec<Option<String>> {
        self.content_types.lock().unwrap().clone()
    }

    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    async fn transfer(&self, key: &str, data: Bytes, options: &PutOptions) -> Result<PutResult> {
        if self.fail_put.contains(key) {
            self.pause().await;
            return Err(anyhow!("network"));
        }
        let total = data.len() as u64;
        options.report(total / 2, total)?;
        self.pause().await;
        options.report(total, total)?;
        Ok(PutResult {
            key: key.to_string(),
        })
    }

    async fn pause(&self) {
        if self.delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[async_trait]
impl StorageClient for MockStorage {
    async fn put(&self, key: &str, data: Bytes, options: PutOptions) -> Result<PutResult> {
        self.enter();
        self.puts.lock().unwrap().push(key.to_string());
        self.content_types
            .lock()
            .unwrap()
            .push(options.content_type.clone());

        if let Some(hook) = &self.on_put {
            hook(key);
        }

        let result = self.transfer(key, data, &options).await;
        self.leave();
        result
    }

    async fn get(&self, key: &str, options: &Value) -> Result<String> {
        self.enter();
        self.gets
            .lock()
            .unwrap()
            .push((key.to_string(), options.clone()));
        self.pause().await;
        self.leave();

        if self.fail_get.contains(key) {
            return Err(anyhow!("url lookup failed"));
        }
        Ok(format!("https://storage.example.com/{}", key))
    }
}

pub fn ids(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

/// Provider keying each object by its file name, failing for chosen file ids
#[derive(Default)]
pub struct NamedParams {
    fail_ids: HashSet<String>,
    calls: AtomicUsize,
}

impl NamedParams {
    pub fn failing_for(ids: &[&str]) -> Self {
        Self {
            fail_ids: ids.iter().map(|s| s.to_string()).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ParameterProvider for NamedParams {
    async fn get_upload_parameters(&self, file: &UploadFile) -> Result<UploadParameters> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.fail_ids.contains(&file.id) {
            return Err(anyhow!("no parameters for {}", file.id));
        }
        Ok(UploadParameters::new(file.name.clone()))
    }
}
