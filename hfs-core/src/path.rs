// SPDX-License-Identifier: AGPL-3.0-or-later
//! Resource path abstraction

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{HfsError, HfsResult};

/// Normalized path of a resource, shared by client and server.
///
/// Segments never contain `/`, `\`, NUL, `.` or `..`, so a path can always be
/// joined onto a backend root without escaping it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourcePath {
    /// Path segments
    pub segments: Vec<String>,
}

impl ResourcePath {
    /// Parse a decoded path such as `/docs/a.txt`.
    pub fn new(path: impl AsRef<str>) -> HfsResult<Self> {
        Self::root().join(path)
    }

    /// Parse the raw (percent-encoded) path component of a request URL.
    pub fn from_url_path(raw: &str) -> HfsResult<Self> {
        let mut path = Self::root();
        for part in raw.split('/').filter(|s| !s.is_empty()) {
            let decoded = urlencoding::decode(part)
                .map_err(|_| HfsError::InvalidPath(raw.to_string()))?;
            // An encoded `/` separates segments like a literal one
            for segment in decoded.split('/') {
                path.push(segment, raw)?;
            }
        }
        Ok(path)
    }

    pub fn root() -> Self {
        Self { segments: Vec::new() }
    }

    /// Join a relative path, resolving `.` and `..` lexically. `..` stops at the root.
    pub fn join(&self, name: impl AsRef<str>) -> HfsResult<Self> {
        let name = name.as_ref();
        let mut path = self.clone();
        for part in name.split('/').filter(|s| !s.is_empty()) {
            path.push(part, name)?;
        }
        Ok(path)
    }

    fn push(&mut self, part: &str, original: &str) -> HfsResult<()> {
        match part {
            "" | "." => {}
            ".." => {
                self.segments.pop();
            }
            _ if part.contains(['/', '\\', '\0']) => {
                return Err(HfsError::InvalidPath(original.to_string()));
            }
            _ => self.segments.push(part.to_string()),
        }
        Ok(())
    }

    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            None
        } else {
            let mut segments = self.segments.clone();
            segments.pop();
            Some(Self { segments })
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(|s| s.as_str())
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn to_path_string(&self) -> String {
        if self.segments.is_empty() {
            "/".to_string()
        } else {
            format!("/{}", self.segments.join("/"))
        }
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_path_string())
    }
}
