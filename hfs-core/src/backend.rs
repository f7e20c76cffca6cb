// SPDX-License-Identifier: AGPL-3.0-or-later
//! Storage backend trait

use async_trait::async_trait;
use std::pin::Pin;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::{error::HfsResult, ResourcePath};

/// Readable file content
pub type ByteReader = Pin<Box<dyn AsyncRead + Send>>;

/// Writable handle returned by [`StorageBackend::open_write`].
///
/// Dropping the handle releases it; `sync` must be called for the written
/// content to be durable.
#[async_trait]
pub trait ContentWriter: AsyncWrite + Send + Unpin {
    /// Flush buffered data and persist it to the underlying storage.
    async fn sync(&mut self) -> HfsResult<()>;
}

/// Storage backend trait
///
/// A backend is shared by every in-flight request. None of these operations
/// are atomic with respect to each other: an `exists` answer may be stale by
/// the time a following `open_write` or `remove` runs.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    fn id(&self) -> &str;
    fn display_name(&self) -> &str;

    async fn exists(&self, path: &ResourcePath) -> HfsResult<bool>;

    /// Open existing content for reading. Fails with `NotFound` if absent.
    async fn open_read(&self, path: &ResourcePath) -> HfsResult<ByteReader>;

    /// Open or create the resource, creating parents as needed, and truncate
    /// it to zero length.
    async fn open_write(&self, path: &ResourcePath) -> HfsResult<Box<dyn ContentWriter>>;

    /// Remove the resource. Fails with `NotFound` if absent.
    async fn remove(&self, path: &ResourcePath) -> HfsResult<()>;
}
