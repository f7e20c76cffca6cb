// SPDX-License-Identifier: AGPL-3.0-or-later
//! Logging configuration
//!
//! The subscriber is built once from an explicit [`LogConfig`] and installed
//! before any command runs. `RUST_LOG` directives, when set, refine the
//! configured level per target.

use hfs_core::{HfsError, HfsResult};
use std::convert::Infallible;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Mutex;
use tracing::{Dispatch, Level};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

/// Where log lines are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogDestination {
    Stderr,
    Stdout,
    File(PathBuf),
}

impl FromStr for LogDestination {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "stderr" => LogDestination::Stderr,
            "stdout" => LogDestination::Stdout,
            path => LogDestination::File(PathBuf::from(path)),
        })
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub destination: LogDestination,
}

impl LogConfig {
    fn filter(&self) -> EnvFilter {
        EnvFilter::builder()
            .with_default_directive(LevelFilter::from_level(self.level).into())
            .from_env_lossy()
    }

    /// Build the subscriber without installing it.
    pub fn build(&self) -> HfsResult<Dispatch> {
        let builder = tracing_subscriber::fmt().with_env_filter(self.filter());

        let dispatch = match &self.destination {
            LogDestination::Stderr => Dispatch::new(builder.with_writer(std::io::stderr).finish()),
            LogDestination::Stdout => Dispatch::new(builder.with_writer(std::io::stdout).finish()),
            LogDestination::File(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|e| HfsError::Io(e).context(format!("failed to open log file {}", path.display())))?;
                Dispatch::new(builder.with_ansi(false).with_writer(Mutex::new(file)).finish())
            }
        };
        Ok(dispatch)
    }
}

/// Install the subscriber described by `config` for the rest of the process.
pub fn init(config: &LogConfig) -> HfsResult<()> {
    let dispatch = config.build()?;
    tracing::dispatcher::set_global_default(dispatch).map_err(|e| HfsError::Other(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_destination() {
        assert_eq!("stderr".parse::<LogDestination>().unwrap(), LogDestination::Stderr);
        assert_eq!("stdout".parse::<LogDestination>().unwrap(), LogDestination::Stdout);
        assert_eq!(
            "/var/log/hfs.log".parse::<LogDestination>().unwrap(),
            LogDestination::File(PathBuf::from("/var/log/hfs.log"))
        );
    }

    #[test]
    fn test_file_destination_receives_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hfs.log");
        let config = LogConfig {
            level: Level::INFO,
            destination: LogDestination::File(path.clone()),
        };

        let dispatch = config.build().unwrap();
        tracing::dispatcher::with_default(&dispatch, || {
            tracing::info!(path = "/a.txt", "successfully saved file");
            tracing::debug!("filtered out");
        });

        let logged = std::fs::read_to_string(&path).unwrap();
        assert!(logged.contains("successfully saved file"));
        assert!(logged.contains("/a.txt"));
        assert!(!logged.contains("filtered out"));
    }

    #[test]
    fn test_unwritable_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogConfig {
            level: Level::INFO,
            destination: LogDestination::File(dir.path().join("missing/dir/hfs.log")),
        };

        let err = config.build().unwrap_err();
        assert!(err.to_string().contains("failed to open log file"));
    }
}
