// SPDX-License-Identifier: AGPL-3.0-or-later
//! Local filesystem backend

use async_trait::async_trait;
use hfs_core::{
    backend::{ByteReader, ContentWriter, StorageBackend},
    error::{HfsError, HfsResult},
    ResourcePath,
};
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Local filesystem backend, rooted at a directory
pub struct LocalBackend {
    id: String,
    root: PathBuf,
}

impl LocalBackend {
    pub fn new(id: impl Into<String>, root: impl AsRef<Path>) -> Self {
        Self {
            id: id.into(),
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn to_real_path(&self, path: &ResourcePath) -> PathBuf {
        let mut real = self.root.clone();
        for seg in &path.segments {
            real.push(seg);
        }
        real
    }
}

fn not_found_or_io(err: io::Error, path: &ResourcePath) -> HfsError {
    if err.kind() == io::ErrorKind::NotFound {
        HfsError::NotFound(path.to_string())
    } else {
        HfsError::Io(err)
    }
}

/// Open file handed out by [`LocalBackend::open_write`]
struct LocalFile {
    file: fs::File,
}

impl AsyncWrite for LocalFile {
    fn poll_write(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.file).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.file).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.file).poll_shutdown(cx)
    }
}

#[async_trait]
impl ContentWriter for LocalFile {
    async fn sync(&mut self) -> HfsResult<()> {
        // tokio buffers writes in a background task until flushed
        self.file.flush().await?;
        self.file.sync_all().await?;
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        "Local Filesystem"
    }

    async fn exists(&self, path: &ResourcePath) -> HfsResult<bool> {
        Ok(fs::try_exists(self.to_real_path(path)).await?)
    }

    async fn open_read(&self, path: &ResourcePath) -> HfsResult<ByteReader> {
        let real = self.to_real_path(path);
        let meta = fs::metadata(&real).await.map_err(|e| not_found_or_io(e, path))?;
        if !meta.is_file() {
            return Err(HfsError::NotAFile(path.to_string()));
        }

        let file = fs::File::open(&real).await.map_err(|e| not_found_or_io(e, path))?;
        Ok(Box::pin(file))
    }

    async fn open_write(&self, path: &ResourcePath) -> HfsResult<Box<dyn ContentWriter>> {
        if path.is_root() {
            return Err(HfsError::NotAFile(path.to_string()));
        }

        let real = self.to_real_path(path);
        if let Some(parent) = real.parent() {
            fs::create_dir_all(parent).await?;
        }

        let file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&real)
            .await?;
        tracing::debug!(path = %path, real = %real.display(), "opened file for writing");

        Ok(Box::new(LocalFile { file }))
    }

    async fn remove(&self, path: &ResourcePath) -> HfsResult<()> {
        if path.is_root() {
            return Err(HfsError::NotAFile(path.to_string()));
        }

        let real = self.to_real_path(path);
        let meta = fs::metadata(&real).await.map_err(|e| not_found_or_io(e, path))?;

        if meta.is_dir() {
            fs::remove_dir(&real).await.map_err(|e| not_found_or_io(e, path))?;
        } else {
            fs::remove_file(&real).await.map_err(|e| not_found_or_io(e, path))?;
        }
        Ok(())
    }
}
