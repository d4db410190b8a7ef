//! Failure ledger: durable record of chunks that failed after exhausting retries.
//!
//! Stored as a JSON array of `{index, start, end}` next to the output file
//! (`<output>.failed_chunks.json`). The file exists only while there are
//! unrecovered chunks; it is overwritten on each failing pass and deleted on
//! full success.

use std::path::{Path, PathBuf};

use crate::chunker::Chunk;

/// Suffix appended to the output path to form the ledger path.
pub const LEDGER_SUFFIX: &str = ".failed_chunks.json";

/// Ledger path for an output file: `file.iso` -> `file.iso.failed_chunks.json`.
pub fn ledger_path(output_path: &Path) -> PathBuf {
    let mut o = output_path.as_os_str().to_owned();
    o.push(LEDGER_SUFFIX);
    PathBuf::from(o)
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("failed to read failed chunks record {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The ledger exists but cannot be parsed. Fatal: pending chunks are unknown.
    #[error("failed to parse failed chunks record {}: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize failed chunks record: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("failed to write failed chunks record {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to delete failed chunks record {}: {source}", .path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct FailureLedger {
    path: PathBuf,
}

impl FailureLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Ledger stored next to `output_path` with the default suffix.
    pub fn for_output(output_path: &Path) -> Self {
        Self::new(ledger_path(output_path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True while a previous pass left unrecovered chunks.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Replace the ledger content with `chunks`.
    ///
    /// Writes a sibling temp file and renames it over the ledger so a crash
    /// mid-write never leaves a truncated record behind.
    pub fn save(&self, chunks: &[Chunk]) -> Result<(), LedgerError> {
        let json = serde_json::to_vec_pretty(chunks).map_err(LedgerError::Serialize)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| LedgerError::Write {
                path: self.path.clone(),
                source,
            })?;
        }
        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, json)
            .and_then(|()| std::fs::rename(&tmp, &self.path))
            .map_err(|source| LedgerError::Write {
                path: self.path.clone(),
                source,
            })?;
        tracing::debug!(path = %self.path.display(), chunks = chunks.len(), "saved failed chunks");
        Ok(())
    }

    /// Chunks recorded by the last failing pass. A missing ledger is an empty list.
    pub fn load(&self) -> Result<Vec<Chunk>, LedgerError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(LedgerError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        serde_json::from_slice(&bytes).map_err(|source| LedgerError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Delete the ledger. Deleting a missing ledger is not an error.
    pub fn clear(&self) -> Result<(), LedgerError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "cleared failed chunks record");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(LedgerError::Remove {
                path: self.path.clone(),
                source,
            }),
        }
    }
}
