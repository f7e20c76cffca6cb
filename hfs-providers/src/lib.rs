// SPDX-License-Identifier: AGPL-3.0-or-later
//! Storage providers for the HTTP File Server
//!
//! Backends implementing [`hfs_core::StorageBackend`]: a rooted directory on
//! local disk and an in-process map.

#[cfg(feature = "local")]
mod local;

#[cfg(feature = "memory")]
mod memory;

#[cfg(feature = "local")]
pub use local::LocalBackend;

#[cfg(feature = "memory")]
pub use memory::MemoryBackend;
