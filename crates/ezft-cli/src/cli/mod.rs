//! CLI for EZFT: `client`, `server` and `checksum`.

mod commands;
mod signal;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand};
use ezft_core::config::{self, EzftConfig};
use ezft_core::logging;

use commands::{run_checksum, run_client, run_server};

/// Log directory used when neither the flag nor the config file names one.
const DEFAULT_LOG_HOME: &str = "./logs";

#[derive(Debug, Parser)]
#[command(name = "ezft", version)]
#[command(about = "EZFT: range-aware file server and resumable download client", long_about = None)]
pub struct Cli {
    /// Directory for client.log / server.log.
    #[arg(long, global = true, value_name = "DIR")]
    pub log_home: Option<PathBuf>,

    /// Log level or filter (e.g. debug, info, ezft_core=trace). RUST_LOG wins.
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download a file, resuming a previous partial download if possible.
    Client(ClientArgs),

    /// Serve a directory with HTTP Range support.
    Server(ServerArgs),

    /// Compute SHA-256 of a file (e.g. after download).
    Checksum {
        /// Path to the file.
        path: PathBuf,

        /// Expected hex digest; exit with an error on mismatch.
        #[arg(long, value_name = "HEX")]
        expect: Option<String>,
    },
}

#[derive(Debug, Clone, Args)]
pub struct ClientArgs {
    /// URL of the file to download.
    #[arg(short = 'u', long)]
    pub url: String,

    /// Output file (default: down/<last URL path segment>).
    #[arg(short = 'o', long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Chunk size in bytes (ignored when auto-chunking).
    #[arg(short = 's', long, value_name = "BYTES")]
    pub chunk_size: Option<u64>,

    /// Number of chunks downloaded at once.
    #[arg(short = 'c', long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Retries per chunk after the first attempt.
    #[arg(short = 'r', long, value_name = "N")]
    pub retry: Option<u32>,

    /// Resume from a previous partial download (true/false).
    #[arg(long, action = ArgAction::Set, value_name = "BOOL")]
    pub resume: Option<bool>,

    /// Pick chunk size from the file size (true/false).
    #[arg(long, action = ArgAction::Set, value_name = "BOOL")]
    pub auto_chunk: Option<bool>,

    /// Show a progress bar (true/false).
    #[arg(short = 'p', long, action = ArgAction::Set, value_name = "BOOL")]
    pub progress: Option<bool>,
}

#[derive(Debug, Clone, Args)]
pub struct ServerArgs {
    /// Directory to serve.
    #[arg(short = 'd', long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Port to listen on.
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Require basic auth with this user name (needs --auth-password).
    #[arg(long, requires = "auth_password", value_name = "USER")]
    pub auth_user: Option<String>,

    /// Password for --auth-user.
    #[arg(long, requires = "auth_user", value_name = "PASSWORD")]
    pub auth_password: Option<String>,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let cfg = config::load_or_init().unwrap_or_else(|e| {
            eprintln!("ezft: using default configuration ({:#})", e);
            EzftConfig::default()
        });
        let log_home = self
            .log_home
            .clone()
            .or_else(|| cfg.log_home.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_HOME));
        let log_level = self.log_level.clone().or_else(|| cfg.log_level.clone());

        match self.command {
            CliCommand::Client(args) => {
                init_file_logging(&log_home, "client.log", log_level.as_deref());
                tracing::debug!("loaded config: {:?}", cfg);
                run_client(args, &cfg.client).await?;
            }
            CliCommand::Server(args) => {
                init_file_logging(&log_home, "server.log", log_level.as_deref());
                tracing::debug!("loaded config: {:?}", cfg);
                run_server(args, &cfg.server).await?;
            }
            CliCommand::Checksum { path, expect } => {
                logging::init_logging_stderr(log_level.as_deref());
                run_checksum(&path, expect.as_deref()).await?;
            }
        }
        Ok(())
    }
}

fn init_file_logging(log_home: &Path, file_name: &str, level: Option<&str>) {
    if let Err(e) = logging::init_logging(log_home, file_name, level) {
        eprintln!("ezft: logging disabled ({:#})", e);
    }
}

#[cfg(test)]
mod tests;
