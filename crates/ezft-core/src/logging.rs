use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Level used when neither `RUST_LOG` nor `--log-level` is set.
pub const DEFAULT_LOG_LEVEL: &str = "info";

fn env_filter(level: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = level.unwrap_or(DEFAULT_LOG_LEVEL);
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL))
    })
}

/// Clones one append-mode handle per event; falls back to stderr if the clone fails.
struct FileMakeWriter(fs::File);

enum LogWriter {
    File(fs::File),
    Stderr(std::io::Stderr),
}

impl std::io::Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            LogWriter::File(f) => f.write(buf),
            LogWriter::Stderr(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            LogWriter::File(f) => f.flush(),
            LogWriter::Stderr(s) => s.flush(),
        }
    }
}

impl<'a> MakeWriter<'a> for FileMakeWriter {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        match self.0.try_clone() {
            Ok(f) => LogWriter::File(f),
            Err(_) => LogWriter::Stderr(std::io::stderr()),
        }
    }
}

fn open_log_file(log_dir: &Path, file_name: &str) -> Result<(fs::File, PathBuf)> {
    fs::create_dir_all(log_dir)?;
    let path = log_dir.join(file_name);
    let file = fs::OpenOptions::new().create(true).append(true).open(&path)?;
    Ok((file, path))
}

/// Initialize structured logging to `<log_dir>/<file_name>` (e.g. `logs/client.log`).
///
/// If the directory or file cannot be opened, logs go to stderr instead and a
/// warning is emitted. Calling this twice in one process is a no-op.
pub fn init_logging(log_dir: &Path, file_name: &str, level: Option<&str>) -> Result<()> {
    let (writer, log_path, open_err) = match open_log_file(log_dir, file_name) {
        Ok((file, path)) => (BoxMakeWriter::new(FileMakeWriter(file)), Some(path), None),
        Err(e) => (BoxMakeWriter::new(std::io::stderr), None, Some(e)),
    };

    let installed = tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .is_ok();
    if !installed {
        return Ok(());
    }

    match (log_path, open_err) {
        (Some(path), _) => tracing::info!("ezft logging initialized at {}", path.display()),
        (None, Some(e)) => tracing::warn!(
            "cannot open log file in {}: {:#}; logging to stderr",
            log_dir.display(),
            e
        ),
        (None, None) => {}
    }
    Ok(())
}

/// Stderr-only logging, used by short commands such as `ezft checksum`.
pub fn init_logging_stderr(level: Option<&str>) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_log_file_creates_dir() {
        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("nested/logs");
        let (_f, path) = open_log_file(&logs, "client.log").unwrap();
        assert_eq!(path, logs.join("client.log"));
        assert!(path.exists());
    }

    #[test]
    fn open_log_file_fails_when_dir_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("logs");
        fs::write(&blocker, b"x").unwrap();
        assert!(open_log_file(&blocker, "client.log").is_err());
    }
}
