//! storage-uploader library - hands queued files to an injected object-storage client

pub mod config;
pub mod error;
pub mod host;
pub mod i18n;
pub mod limit;
pub mod settle;
pub mod storage;
pub mod uploader;

// Re-export commonly used types
pub use config::{Config, ConfigFile, UploaderOptions};
pub use error::{SharedError, UploadError};
pub use host::{Host, MemoryHost, UploadEvent, UploadFile, UploadHandler};
pub use storage::{LocalDirStorage, StorageClient};
pub use uploader::{provider_fn, ParameterProvider, UploadParameters, Uploader};
