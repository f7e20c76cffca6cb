// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP File Server CLI
//!
//! Serve a directory over HTTP and copy files to and from running servers.

mod commands;
mod logging;

use clap::{Parser, Subcommand};
use console::style;
use logging::{LogConfig, LogDestination};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "hfs")]
#[command(author, version, about = "HTTP File Server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "HFS_LOG_LEVEL", default_value = "info")]
    log_level: tracing::Level,

    /// Log destination: stderr, stdout or a file path
    #[arg(long, global = true, env = "HFS_LOG_FILE", default_value = "stderr")]
    log_file: LogDestination,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an HTTP File Server
    Serve {
        /// Directory to serve
        #[arg(default_value = ".")]
        root: PathBuf,

        /// Address to listen on
        #[arg(long, env = "HFS_ADDR", default_value = "0.0.0.0:8080")]
        addr: String,

        /// Seconds to wait for in-flight requests on shutdown
        #[arg(long, default_value_t = 5)]
        shutdown_timeout: u64,

        /// Serve from memory instead of ROOT
        #[arg(long)]
        memory: bool,
    },

    /// Copy files to and from an HFS server
    #[command(after_help = "\
Examples:
  # Copy from an HFS server to the current working directory.
  hfs cp http://example.org/hello.txt .

  # Copy from the current working directory to an HFS server.
  hfs cp hello.txt http://example.org/")]
    Cp {
        /// Source file or URL
        source: String,

        /// Destination file, directory or URL
        dest: String,
    },

    /// Remove files from an HFS server
    Rm {
        /// URL(s) to remove
        #[arg(required = true)]
        urls: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_config = LogConfig {
        level: cli.log_level,
        destination: cli.log_file,
    };
    if let Err(e) = logging::init(&log_config) {
        eprintln!("{} failed to initialize logging: {e}", style("Error:").red());
        return ExitCode::FAILURE;
    }

    let result = match cli.command {
        Commands::Serve { root, addr, shutdown_timeout, memory } => {
            commands::serve(&root, &addr, Duration::from_secs(shutdown_timeout), memory).await
        }
        Commands::Cp { source, dest } => {
            commands::cp(&source, &dest).await
        }
        Commands::Rm { urls } => {
            commands::rm(&urls).await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", style("Error:").red());
            ExitCode::FAILURE
        }
    }
}
