// SPDX-License-Identifier: AGPL-3.0-or-later
//! CLI command implementations

use console::style;
use hfs_core::{HfsError, HfsResult, StorageBackend};
use hfs_http::{FileServer, FileServerClient, RemoteFile};
use hfs_providers::{LocalBackend, MemoryBackend};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

/// Resolve ROOT_DIR against the current directory
fn resolve_root(root: &Path) -> HfsResult<PathBuf> {
    let root = if root.is_absolute() {
        root.to_path_buf()
    } else {
        std::env::current_dir()?.join(root)
    };

    let root = root
        .canonicalize()
        .map_err(|e| HfsError::Io(e).context(format!("invalid root directory {}", root.display())))?;
    if !root.is_dir() {
        return Err(HfsError::Other(format!("root is not a directory: {}", root.display())));
    }
    Ok(root)
}

/// Resolves on Ctrl-C
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for interrupt signal");
        std::future::pending::<()>().await;
    }
}

/// Start an HTTP File Server
pub async fn serve(root: &Path, addr: &str, shutdown_timeout: Duration, memory: bool) -> HfsResult<()> {
    let backend: Arc<dyn StorageBackend> = if memory {
        tracing::info!("serving from memory");
        Arc::new(MemoryBackend::new())
    } else {
        let local = LocalBackend::new("local", resolve_root(root)?);
        tracing::info!(root = %local.root().display(), "serving directory");
        Arc::new(local)
    };

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| HfsError::Io(e).context(format!("failed to listen on {addr}")))?;

    FileServer::new(backend)
        .serve(listener, interrupted(), shutdown_timeout)
        .await
}

/// Copy a file to, from or between HFS servers
pub async fn cp(source: &str, dest: &str) -> HfsResult<()> {
    let client = FileServerClient::new();
    let copied_to = transfer(&client, source, dest).await?;

    println!("Copied {} -> {}", source, style(copied_to).green());
    Ok(())
}

/// Remove files from HFS servers, stopping at the first failure
pub async fn rm(urls: &[String]) -> HfsResult<()> {
    let client = FileServerClient::new();

    for url in urls {
        let file = RemoteFile::parse(url)?;
        client
            .remove(&file)
            .await
            .map_err(|e| e.context(format!("failed to remove {url}")))?;
        println!("Removed {}", url);
    }

    Ok(())
}

/// Move the content of `source` to `dest`, returning where it was written.
///
/// The source is always read in full before the destination is touched.
/// Nothing is cleaned up if the write fails.
pub(crate) async fn transfer(client: &FileServerClient, source: &str, dest: &str) -> HfsResult<String> {
    match (RemoteFile::is_remote(source), RemoteFile::is_remote(dest)) {
        (true, true) => {
            let src = RemoteFile::parse(source)?;
            let content = download(client, &src).await?;

            let dst = remote_destination(dest, src.path().name())?;
            upload(client, &dst, content).await?;
            Ok(dst.to_string())
        }
        (true, false) => {
            let src = RemoteFile::parse(source)?;
            let content = download(client, &src).await?;

            let dst = local_destination(dest, src.path().name()).await?;
            write_local(&dst, &content)
                .await
                .map_err(|e| e.context(format!("failed to write destination file {}", dst.display())))?;
            Ok(dst.display().to_string())
        }
        (false, true) => {
            let content = fs::read(source)
                .await
                .map_err(|e| HfsError::Io(e).context(format!("failed to read source file {source}")))?;

            let name = Path::new(source).file_name().and_then(|n| n.to_str());
            let dst = remote_destination(dest, name)?;
            upload(client, &dst, content).await?;
            Ok(dst.to_string())
        }
        (false, false) => Err(HfsError::Other(format!(
            "cannot copy {source} to {dest}: at least one side must be an HFS URL"
        ))),
    }
}

async fn download(client: &FileServerClient, src: &RemoteFile) -> HfsResult<Vec<u8>> {
    let content = client
        .download(src)
        .await
        .map_err(|e| e.context(format!("failed to download file {src}")))?;
    tracing::debug!(src = %src, total_bytes = content.len(), "downloaded file");
    Ok(content.to_vec())
}

async fn upload(client: &FileServerClient, dst: &RemoteFile, content: Vec<u8>) -> HfsResult<()> {
    let total_bytes = content.len();
    client
        .upload(dst, content)
        .await
        .map_err(|e| e.context(format!("failed to upload file {dst}")))?;
    tracing::debug!(dst = %dst, total_bytes, "uploaded file");
    Ok(())
}

/// `dest` as a remote file; a trailing `/` means "into this directory".
fn remote_destination(dest: &str, name: Option<&str>) -> HfsResult<RemoteFile> {
    let file = RemoteFile::parse(dest)?;
    if !dest.ends_with('/') && !file.path().is_root() {
        return Ok(file);
    }

    match name {
        Some(name) => file.join(name),
        None => Err(HfsError::InvalidUrl(format!("{dest}: no file name to copy into"))),
    }
}

/// `dest` as a local file; an existing directory receives `name`.
async fn local_destination(dest: &str, name: Option<&str>) -> HfsResult<PathBuf> {
    let path = PathBuf::from(dest);
    let is_dir = fs::metadata(&path).await.map(|m| m.is_dir()).unwrap_or(false);
    if !is_dir {
        return Ok(path);
    }

    match name {
        Some(name) => Ok(path.join(name)),
        None => Err(HfsError::Other(format!("{dest}: no file name to copy into"))),
    }
}

async fn write_local(path: &Path, content: &[u8]) -> HfsResult<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(content).await?;
    file.flush().await?;
    file.sync_all().await?;
    Ok(())
}
