// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for the HTTP File Server

use std::time::Duration;
use thiserror::Error;

/// Result type alias
pub type HfsResult<T> = Result<T, HfsError>;

/// Main error type
#[derive(Error, Debug)]
pub enum HfsError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Method not supported: {0}")]
    MethodNotSupported(String),

    #[error("Not a file: {0}")]
    NotAFile(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected HTTP status code received: {0}")]
    UnexpectedStatus(u16),

    #[error("Shutdown timed out after {0:?} with requests still in flight")]
    ShutdownTimeout(Duration),

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<HfsError>,
    },

    #[error("{0}")]
    Other(String),
}

impl HfsError {
    /// Wrap this error with a description of what was being attempted.
    pub fn context(self, context: impl Into<String>) -> Self {
        HfsError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, beneath any added context
    pub fn root_cause(&self) -> &HfsError {
        match self {
            HfsError::Context { source, .. } => source.root_cause(),
            err => err,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.root_cause(), HfsError::NotFound(_))
    }

    /// HTTP status a file server answers with when a request fails with this error.
    pub fn status_code(&self) -> u16 {
        match self.root_cause() {
            HfsError::NotFound(_) => 404,
            HfsError::MethodNotSupported(_) => 405,
            _ => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_not_found() {
        assert!(HfsError::NotFound("/a.txt".into()).is_not_found());

        assert!(!HfsError::UnexpectedStatus(500).is_not_found());
        assert!(!HfsError::Transport("connection reset".into()).is_not_found());
    }

    #[test]
    fn test_context() {
        let err = HfsError::NotFound("http://example.org/a.txt".into())
            .context("failed to download file");

        assert!(err.is_not_found());
        assert!(matches!(err.root_cause(), HfsError::NotFound(_)));
        assert_eq!(err.status_code(), 404);
        assert_eq!(
            err.to_string(),
            "failed to download file: File not found: http://example.org/a.txt"
        );

        let err = HfsError::UnexpectedStatus(502).context("failed to upload file");
        assert!(!err.is_not_found());
        assert!(matches!(err.root_cause(), HfsError::UnexpectedStatus(502)));
    }

    #[test]
    fn test_status_code() {
        assert_eq!(HfsError::NotFound("/a.txt".into()).status_code(), 404);
        assert_eq!(HfsError::MethodNotSupported("PUT".into()).status_code(), 405);
        assert_eq!(HfsError::InvalidPath("%ff".into()).status_code(), 500);
        assert_eq!(HfsError::NotAFile("/dir".into()).status_code(), 500);

        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(HfsError::from(io_err).status_code(), 500);
    }

    #[test]
    fn test_error_display() {
        let err = HfsError::NotFound("/path/to/file".into());
        assert_eq!(format!("{}", err), "File not found: /path/to/file");

        let err = HfsError::UnexpectedStatus(418);
        assert!(format!("{}", err).contains("418"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let hfs_err: HfsError = io_err.into();
        assert!(matches!(hfs_err, HfsError::Io(_)));
    }
}
