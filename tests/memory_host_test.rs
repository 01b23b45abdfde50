//! Tests for the in-memory host

mod common;

use std::sync::Arc;

use common::{MockStorage, NamedParams};
use storage_uploader::host::{MemoryHost, NewFile, UploadFile};
use storage_uploader::{Host, Uploader, UploaderOptions};

#[test]
fn test_add_file_generates_ids() {
    let host = MemoryHost::new();
    let a = host.add_file(NewFile::new("a.txt", "a"));
    let b = host.add_file(NewFile::new("b.txt", "b").with_mime_type("text/plain"));

    assert_ne!(a, b);
    assert!(a.starts_with("file-"));
    assert_eq!(host.file_ids(), vec![a.clone(), b.clone()]);

    let file = host.get_file(&b).unwrap();
    assert_eq!(file.name, "b.txt");
    assert_eq!(file.mime_type.as_deref(), Some("text/plain"));
    assert_eq!(file.size(), 1);
}

#[test]
fn test_remove_and_flag_files() {
    let host = MemoryHost::new();
    host.insert_file(UploadFile::new("f1", "a.txt", "a"));

    assert!(host.set_file_error("f1", "too big"));
    assert_eq!(host.get_file("f1").unwrap().error.as_deref(), Some("too big"));
    assert!(!host.set_file_error("nope", "x"));

    assert!(host.remove_file("f1").is_some());
    assert!(host.get_file("f1").is_none());
    assert!(host.file_ids().is_empty());
}

#[tokio::test]
async fn test_upload_without_uploaders() {
    let host = MemoryHost::new();
    let id = host.add_file(NewFile::new("a.txt", "a"));

    let summary = host.upload().await;

    assert!(summary.successful.is_empty());
    assert_eq!(summary.failed, vec![id]);
}

#[tokio::test]
async fn test_upload_summary() {
    let host = Arc::new(MemoryHost::new());
    let ok = host.add_file(NewFile::new("ok.txt", "data"));
    let bad = host.add_file(NewFile::new("bad.txt", "data"));
    let flagged = host.add_file(NewFile::new("flagged.txt", "data"));
    host.set_file_error(&flagged, "rejected by host");

    let storage = Arc::new(MockStorage::new().failing_put("bad.txt"));
    let options = UploaderOptions {
        get_upload_parameters: Some(Arc::new(NamedParams::default())),
        ..Default::default()
    };
    let uploader = Uploader::new(host.clone(), storage.clone(), options).unwrap();
    uploader.install();

    let summary = host.upload().await;

    assert_eq!(summary.successful, vec![ok.clone()]);
    assert_eq!(summary.failed, vec![bad.clone(), flagged.clone()]);
    assert!(host.upload_url(&ok).is_some());
    assert_eq!(host.upload_error(&bad).as_deref(), Some("network"));
    assert!(host.upload_error(&flagged).is_none());

    // A second run only retries files that did not make it
    host.clear_events();
    host.upload().await;
    let retried: Vec<String> = storage.puts();
    assert_eq!(retried, vec!["ok.txt", "bad.txt", "bad.txt"]);

    uploader.uninstall();
}

#[test]
fn test_log_records_messages() {
    let host = MemoryHost::new();
    host.log("first");
    host.log("second");
    assert_eq!(host.logs(), vec!["first", "second"]);
}
