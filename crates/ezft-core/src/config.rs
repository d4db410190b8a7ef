use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ledger;
use crate::retry::RetryPolicy;

/// Default `User-Agent` sent on every request.
pub fn default_user_agent() -> String {
    format!("Mozilla/5.0 (compatible; ezft/{})", env!("CARGO_PKG_VERSION"))
}

/// Parameters for one download session. Built once and handed to the
/// `Downloader`, which never mutates it.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadConfig {
    /// Source URL.
    pub url: String,
    /// Destination file.
    pub output_path: PathBuf,
    /// Failure ledger location (defaults to `<output_path>.failed_chunks.json`).
    pub failed_chunks_path: PathBuf,
    /// Bytes per chunk; ignored when `auto_chunk` is set.
    pub chunk_size: u64,
    /// Chunks in flight at once. Below 2 the remaining range is fetched sequentially.
    pub max_concurrency: usize,
    /// Retries per chunk after the first attempt.
    pub retry_count: u32,
    /// Delay unit for linear backoff (retry n waits n * backoff).
    pub retry_backoff: Duration,
    /// Use chunked, resumable downloads when the server supports ranges.
    pub enable_resume: bool,
    /// Derive chunk size from remaining size instead of `chunk_size`.
    pub auto_chunk: bool,
    pub user_agent: String,
    pub connect_timeout: Duration,
    /// Abort a transfer that stalls (no bytes at all) for this long.
    pub stall_timeout: Duration,
}

impl DownloadConfig {
    /// Config with defaults for everything but the source and destination.
    pub fn new(url: impl Into<String>, output_path: impl Into<PathBuf>) -> Self {
        let output_path = output_path.into();
        Self {
            url: url.into(),
            failed_chunks_path: ledger::ledger_path(&output_path),
            output_path,
            chunk_size: 1024 * 1024,
            max_concurrency: 1,
            retry_count: 3,
            retry_backoff: Duration::from_secs(1),
            enable_resume: true,
            auto_chunk: false,
            user_agent: default_user_agent(),
            connect_timeout: Duration::from_secs(5),
            stall_timeout: Duration::from_secs(10),
        }
    }

    /// Apply the `[client]` table of the config file.
    pub fn with_defaults(mut self, defaults: &ClientDefaults) -> Self {
        self.chunk_size = defaults.chunk_size;
        self.max_concurrency = defaults.concurrency;
        self.retry_count = defaults.retry_count;
        self.retry_backoff = Duration::from_secs_f64(defaults.retry_backoff_secs.max(0.0));
        self.enable_resume = defaults.enable_resume;
        self.auto_chunk = defaults.auto_chunk;
        self
    }

    /// Reject configurations the engine cannot run.
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            anyhow::bail!("download URL must not be empty");
        }
        if self.max_concurrency == 0 {
            anyhow::bail!("max concurrency must be at least 1");
        }
        if self.chunk_size == 0 && !self.auto_chunk {
            anyhow::bail!("chunk size must be greater than 0");
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_count, self.retry_backoff)
    }
}

/// Output path used when none is given: `down/<last URL path segment>`.
pub fn default_output_path(url: &str) -> PathBuf {
    let name = url::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segs| segs.next_back().map(str::to_string))
        })
        .filter(|s| !s.is_empty())
        .or_else(|| {
            url.rsplit('/')
                .next()
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "download.bin".to_string());
    Path::new("down").join(name)
}

/// `[client]` table: defaults for `ezft client` flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientDefaults {
    pub chunk_size: u64,
    pub concurrency: usize,
    pub retry_count: u32,
    pub retry_backoff_secs: f64,
    pub enable_resume: bool,
    pub auto_chunk: bool,
    pub show_progress: bool,
}

impl Default for ClientDefaults {
    fn default() -> Self {
        Self {
            chunk_size: 1024 * 1024,
            concurrency: 1,
            retry_count: 3,
            retry_backoff_secs: 1.0,
            enable_resume: true,
            auto_chunk: true,
            show_progress: true,
        }
    }
}

/// Optional basic-auth credentials for the file server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicAuthConfig {
    pub username: String,
    pub password: String,
}

/// `[server]` table: defaults for `ezft server` flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerDefaults {
    pub root: PathBuf,
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub basic_auth: Option<BasicAuthConfig>,
}

impl Default for ServerDefaults {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./"),
            port: 8080,
            basic_auth: None,
        }
    }
}

/// Global configuration loaded from `~/.config/ezft/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EzftConfig {
    /// Directory for `client.log` / `server.log`.
    pub log_home: Option<PathBuf>,
    /// Default log level (`RUST_LOG` still wins).
    pub log_level: Option<String>,
    pub client: ClientDefaults,
    pub server: ServerDefaults,
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("ezft")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<EzftConfig> {
    let path = config_path()?;
    load_or_init_at(&path)
}

/// Like `load_or_init` but at an explicit path.
pub fn load_or_init_at(path: &Path) -> Result<EzftConfig> {
    if !path.exists() {
        let default_cfg = EzftConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path)?;
    let cfg: EzftConfig =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}
