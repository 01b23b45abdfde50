//! storage-uploader - upload local files through the uploader pipeline

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use storage_uploader::config::ConfigFile;
use storage_uploader::host::{MemoryHost, NewFile};
use storage_uploader::{Host, LocalDirStorage, Uploader, UploaderOptions};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "storage-uploader")]
#[command(about = "Upload local files into a storage directory")]
struct Args {
    /// Directory that receives the uploaded objects
    #[arg(long)]
    dest: PathBuf,

    /// Maximum concurrent uploads (0 = unlimited)
    #[arg(long, env = "STORAGE_UPLOADER_LIMIT")]
    limit: Option<usize>,

    /// JSON config file (id, limit, getOptions, locale)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,

    /// Files to upload
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

async fn queue_files(host: &MemoryHost, files: &[PathBuf]) -> Result<Vec<(String, PathBuf)>> {
    let mut queued = Vec::with_capacity(files.len());
    for path in files {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {:?}", path))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        let mime = mime_guess::from_path(path).first_or_octet_stream();

        let id = host.add_file(NewFile::new(name, data).with_mime_type(mime.essence_str()));
        queued.push((id, path.clone()));
    }
    Ok(queued)
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the summary, logs go to stderr
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mut options = match &args.config {
        Some(path) => ConfigFile::load(path)?.into_options(),
        None => UploaderOptions::default(),
    };
    if args.limit.is_some() {
        options.limit = args.limit;
    }

    let storage = Arc::new(LocalDirStorage::new(&args.dest)?);
    let host = Arc::new(MemoryHost::new());
    let queued = queue_files(&host, &args.files).await?;

    let uploader = Uploader::new(host.clone() as Arc<dyn Host>, storage, options)?;
    uploader.install();

    info!("Uploading {} files to {:?}", queued.len(), args.dest);
    let summary = host.upload().await;
    uploader.uninstall();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        for (id, path) in &queued {
            match (host.upload_url(id), host.upload_error(id)) {
                (Some(url), _) => println!("ok    {} -> {}", path.display(), url),
                (None, Some(err)) => println!("error {}: {}", path.display(), err),
                (None, None) => println!("error {}: not uploaded", path.display()),
            }
        }
    }

    if !summary.failed.is_empty() {
        error!("{} of {} uploads failed", summary.failed.len(), queued.len());
        std::process::exit(1);
    }

    Ok(())
}
