// SPDX-License-Identifier: AGPL-3.0-or-later
//! In-memory backend

use async_trait::async_trait;
use hfs_core::{
    backend::{ByteReader, ContentWriter, StorageBackend},
    error::{HfsError, HfsResult},
    ResourcePath,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::AsyncWrite;

type Files = Arc<RwLock<HashMap<ResourcePath, Vec<u8>>>>;

/// Backend keeping every file in a process-local map.
///
/// Writes land in the map as they happen, so a concurrent reader can observe
/// a truncated or partially written file, the same as on disk.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    files: Files,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current content of `path`, if present.
    pub fn get(&self, path: &ResourcePath) -> Option<Vec<u8>> {
        self.files.read().get(path).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }
}

struct MemoryWriter {
    files: Files,
    path: ResourcePath,
}

impl AsyncWrite for MemoryWriter {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        self.files
            .write()
            .entry(self.path.clone())
            .or_default()
            .extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[async_trait]
impl ContentWriter for MemoryWriter {
    async fn sync(&mut self) -> HfsResult<()> {
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    fn id(&self) -> &str {
        "memory"
    }

    fn display_name(&self) -> &str {
        "In-Memory"
    }

    async fn exists(&self, path: &ResourcePath) -> HfsResult<bool> {
        Ok(self.files.read().contains_key(path))
    }

    async fn open_read(&self, path: &ResourcePath) -> HfsResult<ByteReader> {
        let data = self
            .get(path)
            .ok_or_else(|| HfsError::NotFound(path.to_string()))?;
        Ok(Box::pin(io::Cursor::new(data)))
    }

    async fn open_write(&self, path: &ResourcePath) -> HfsResult<Box<dyn ContentWriter>> {
        if path.is_root() {
            return Err(HfsError::NotAFile(path.to_string()));
        }

        self.files.write().insert(path.clone(), Vec::new());
        Ok(Box::new(MemoryWriter {
            files: Arc::clone(&self.files),
            path: path.clone(),
        }))
    }

    async fn remove(&self, path: &ResourcePath) -> HfsResult<()> {
        self.files
            .write()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| HfsError::NotFound(path.to_string()))
    }
}
