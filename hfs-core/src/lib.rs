// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP File Server Core
//!
//! Core traits and types shared by the protocol server, the protocol client
//! and the storage backends.

pub mod backend;
pub mod error;
pub mod path;

pub use backend::{ByteReader, ContentWriter, StorageBackend};
pub use error::{HfsError, HfsResult};
pub use path::ResourcePath;
