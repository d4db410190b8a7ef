//! `ezft client`: download one URL with progress and interrupt handling.

use std::time::Instant;

use anyhow::{Context, Result};
use ezft_core::config::{self, ClientDefaults, DownloadConfig};
use ezft_core::progress::{self, calculate_speed, format_bytes, format_duration};
use ezft_core::{CancelToken, DownloadOutcome, Downloader};

use super::super::{signal, ClientArgs};

/// Flags override the `[client]` table, which overrides built-in defaults.
pub(crate) fn download_config(args: &ClientArgs, defaults: &ClientDefaults) -> DownloadConfig {
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| config::default_output_path(&args.url));
    let mut cfg = DownloadConfig::new(args.url.clone(), output).with_defaults(defaults);
    if let Some(size) = args.chunk_size {
        cfg.chunk_size = size;
    }
    if let Some(n) = args.concurrency {
        cfg.max_concurrency = n;
    }
    if let Some(n) = args.retry {
        cfg.retry_count = n;
    }
    if let Some(resume) = args.resume {
        cfg.enable_resume = resume;
    }
    if let Some(auto) = args.auto_chunk {
        cfg.auto_chunk = auto;
    }
    cfg
}

pub async fn run_client(args: ClientArgs, defaults: &ClientDefaults) -> Result<()> {
    let cfg = download_config(&args, defaults);
    let show_progress = args.progress.unwrap_or(defaults.show_progress);
    let output = cfg.output_path.clone();
    let ledger_path = cfg.failed_chunks_path.clone();

    println!("Starting download: {}", cfg.url);
    println!("Output file: {}", output.display());
    tracing::info!(
        url = %cfg.url,
        output = %output.display(),
        chunk_size = cfg.chunk_size,
        concurrency = cfg.max_concurrency,
        retry = cfg.retry_count,
        resume = cfg.enable_resume,
        auto_chunk = cfg.auto_chunk,
        "starting download"
    );

    let downloader = Downloader::new(cfg)?;
    let cancel = downloader.cancel_token();
    let probe = downloader.progress_probe();

    let signal_task = tokio::spawn(async move {
        signal::shutdown_signal().await;
        println!("\nReceived interrupt signal, stopping download...");
        cancel.cancel();
    });

    let stop_progress = CancelToken::new();
    let progress_task = show_progress.then(|| {
        tokio::spawn(progress::show_progress_loop(probe, stop_progress.clone()))
    });

    let started = Instant::now();
    let result = tokio::task::spawn_blocking(move || downloader.download())
        .await
        .context("download task failed")?;
    let elapsed = started.elapsed();

    stop_progress.cancel();
    if let Some(task) = progress_task {
        task.abort();
        if result.is_ok() {
            println!("\r{}", progress::render_line(100.0));
        } else {
            println!();
        }
    }
    signal_task.abort();

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(err) => {
            if ledger_path.exists() {
                eprintln!(
                    "Failed chunks recorded in {}; run the same command again to resume.",
                    ledger_path.display()
                );
            }
            return Err(err);
        }
    };

    let size = match outcome {
        DownloadOutcome::AlreadyComplete { size } => {
            println!("File already downloaded completely: {}", output.display());
            tracing::info!(size, "nothing to do");
            return Ok(());
        }
        DownloadOutcome::Chunked { total_size } => total_size,
        DownloadOutcome::Whole { bytes } => bytes,
    };

    println!("✓ Download completed!");
    println!("Duration: {}", format_duration(elapsed));
    println!("File size: {}", format_bytes(size));
    println!("Average speed: {}", calculate_speed(size, elapsed));
    tracing::info!(
        bytes = size,
        elapsed_ms = elapsed.as_millis() as u64,
        "download completed"
    );
    Ok(())
}
