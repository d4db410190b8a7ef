//! Progress reporting: on-disk size against the probed total.
//!
//! The chunked writer does not track completed ranges, so progress is the
//! same heuristic resume uses: current file length over total size.

mod format;

pub use format::{calculate_speed, format_bytes, format_duration};

use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::control::CancelToken;
use crate::storage;

/// Width of the textual bar in columns.
pub const BAR_WIDTH: usize = 50;

/// Snapshot of download progress (CLI-friendly).
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressStats {
    /// Bytes on disk.
    pub bytes_done: u64,
    pub total_bytes: u64,
    pub elapsed: Duration,
}

impl ProgressStats {
    /// Bytes per second since start (0 if no time has passed).
    pub fn bytes_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.bytes_done as f64 / secs
    }

    /// Estimated time left (None while the rate is unknown).
    pub fn eta(&self) -> Option<Duration> {
        let remaining = self.total_bytes.saturating_sub(self.bytes_done);
        if remaining == 0 {
            return Some(Duration::ZERO);
        }
        let rate = self.bytes_per_sec();
        if rate <= 0.0 {
            return None;
        }
        Some(Duration::from_secs_f64(remaining as f64 / rate))
    }

    /// Percent complete, capped at 100.
    pub fn percent(&self) -> f64 {
        if self.total_bytes == 0 {
            return 100.0;
        }
        (self.bytes_done as f64 / self.total_bytes as f64 * 100.0).min(100.0)
    }
}

/// `[█████░░░…]` with `BAR_WIDTH` cells for `percent` in 0..=100.
pub fn render_bar(percent: f64) -> String {
    let filled = ((percent.clamp(0.0, 100.0) * BAR_WIDTH as f64) / 100.0) as usize;
    let filled = filled.min(BAR_WIDTH);
    format!("[{}{}]", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

/// `Download progress: [bar] 42.0%`
pub fn render_line(percent: f64) -> String {
    format!("Download progress: {} {:.1}%", render_bar(percent), percent)
}

/// `Download progress: [bar] 42.0%  1.5 MB/s  ETA 12.0s`
pub fn render_status(stats: &ProgressStats) -> String {
    let eta = stats
        .eta()
        .map(format_duration)
        .unwrap_or_else(|| "--".to_string());
    format!(
        "{}  {}/s  ETA {}",
        render_line(stats.percent()),
        format_bytes(stats.bytes_per_sec() as u64),
        eta
    )
}

/// Reads progress of one output file. Cloned out of a `Downloader`; sees the
/// total size as soon as the probe stores it.
#[derive(Debug, Clone)]
pub struct ProgressProbe {
    output_path: PathBuf,
    total_size: Arc<AtomicU64>,
    started: Instant,
}

impl ProgressProbe {
    pub fn new(output_path: PathBuf, total_size: Arc<AtomicU64>) -> Self {
        Self {
            output_path,
            total_size,
            started: Instant::now(),
        }
    }

    /// Percent of the total on disk; `None` until the total size is known.
    pub fn progress_percent(&self) -> anyhow::Result<Option<f64>> {
        Ok(self.stats()?.map(|s| s.percent()))
    }

    pub fn stats(&self) -> anyhow::Result<Option<ProgressStats>> {
        let total_bytes = self.total_size.load(Ordering::Relaxed);
        if total_bytes == 0 {
            return Ok(None);
        }
        let bytes_done = storage::existing_size(&self.output_path)?;
        Ok(Some(ProgressStats {
            bytes_done,
            total_bytes,
            elapsed: self.started.elapsed(),
        }))
    }
}

/// Redraw the progress line on stdout once per second until `stop` is
/// cancelled. The first line appears after one second. Errors reading the
/// file size skip that tick.
pub async fn show_progress_loop(probe: ProgressProbe, stop: CancelToken) {
    let mut ticker = tokio::time::interval_at(
        tokio::time::Instant::now() + Duration::from_secs(1),
        Duration::from_secs(1),
    );
    loop {
        ticker.tick().await;
        if stop.is_cancelled() {
            return;
        }
        match probe.stats() {
            Ok(Some(stats)) => {
                let mut out = std::io::stdout().lock();
                // Trailing spaces wipe leftovers of a longer previous line.
                let _ = write!(out, "\r{}    ", render_status(&stats));
                let _ = out.flush();
            }
            Ok(None) => {}
            Err(e) => tracing::debug!("progress tick skipped: {:#}", e),
        }
    }
}
