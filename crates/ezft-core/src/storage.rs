//! Output file access for chunked and whole-file downloads.
//!
//! The chunked path opens the output read/write without truncation and
//! treats it as a sparse, randomly addressable byte array: every chunk writer
//! owns a disjoint extent and writes at explicit offsets, so the handle is shared
//! across workers without locking. The file is never preallocated; its
//! on-disk length is what resume uses to find where to continue.

use anyhow::{Context, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
#[cfg(unix)]
use std::os::unix::fs::FileExt;
#[cfg(windows)]
use std::os::windows::fs::FileExt;

/// Shared positioned writer over the output file. Cheap to clone.
#[derive(Debug, Clone)]
pub struct StorageWriter {
    file: Arc<File>,
    path: PathBuf,
}

#[allow(clippy::len_without_is_empty)]
impl StorageWriter {
    /// Open (creating if needed) `path` for read/write without truncation.
    /// Parent directories are created.
    pub fn open_for_resume(path: &Path) -> Result<Self> {
        ensure_parent_dir(path)?;
        let file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("failed to open file: {}", path.display()))?;
        Ok(Self {
            file: Arc::new(file),
            path: path.to_path_buf(),
        })
    }

    /// Write `data` at `offset` without moving any shared cursor. Safe for
    /// concurrent use as long as callers write disjoint extents.
    #[cfg(unix)]
    pub fn write_at(&self, offset: u64, data: &[u8]) -> std::io::Result<()> {
        self.file.write_all_at(data, offset)
    }

    /// `seek_write` may write less than asked; loop until the extent is done.
    #[cfg(windows)]
    pub fn write_at(&self, mut offset: u64, mut data: &[u8]) -> std::io::Result<()> {
        while !data.is_empty() {
            match self.file.seek_write(data, offset) {
                Ok(0) => {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::WriteZero,
                        "failed to write whole buffer",
                    ))
                }
                Ok(n) => {
                    data = &data[n..];
                    offset += n as u64;
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Current on-disk length.
    pub fn len(&self) -> Result<u64> {
        Ok(self
            .file
            .metadata()
            .with_context(|| format!("failed to stat {}", self.path.display()))?
            .len())
    }

    /// Flush file data to disk.
    pub fn sync(&self) -> Result<()> {
        self.file.sync_all().context("storage sync failed")?;
        Ok(())
    }
}

/// Size of an existing file, or 0 if it does not exist.
pub fn existing_size(path: &Path) -> Result<u64> {
    match std::fs::metadata(path) {
        Ok(m) => Ok(m.len()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e).with_context(|| format!("failed to check existing file: {}", path.display())),
    }
}

/// Create the parent directory of `path` if it has one.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_order_writes_land_at_offsets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.bin");
        let writer = StorageWriter::open_for_resume(&path).unwrap();
        let other = writer.clone();
        other.write_at(10, b"bbbb").unwrap();
        writer.write_at(0, b"aaaa").unwrap();
        writer.write_at(4, b"cccc").unwrap();
        writer.sync().unwrap();
        assert_eq!(writer.len().unwrap(), 14);
        let content = std::fs::read(&path).unwrap();
        assert_eq!(&content[0..4], b"aaaa");
        assert_eq!(&content[4..8], b"cccc");
        assert_eq!(&content[8..10], &[0, 0]);
        assert_eq!(&content[10..14], b"bbbb");
    }

    #[test]
    fn concurrent_disjoint_writes_land_at_their_offsets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        let writer = StorageWriter::open_for_resume(&path).unwrap();
        let extents: u8 = 16;
        let extent_len = 4096usize;

        std::thread::scope(|s| {
            for i in 0..extents {
                let writer = writer.clone();
                s.spawn(move || {
                    let data = vec![i; extent_len];
                    let base = u64::from(i) * extent_len as u64;
                    // Many small writes per extent so workers interleave.
                    for (n, piece) in data.chunks(256).enumerate() {
                        writer.write_at(base + (n * 256) as u64, piece).unwrap();
                    }
                });
            }
        });

        let content = std::fs::read(&path).unwrap();
        assert_eq!(content.len(), usize::from(extents) * extent_len);
        for (i, extent) in content.chunks(extent_len).enumerate() {
            assert!(extent.iter().all(|b| usize::from(*b) == i), "extent {} corrupted", i);
        }
    }

    #[test]
    fn reopen_does_not_truncate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        std::fs::write(&path, b"0123456789").unwrap();
        let writer = StorageWriter::open_for_resume(&path).unwrap();
        assert_eq!(writer.len().unwrap(), 10);
        writer.write_at(2, b"xy").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"01xy456789");
    }

    #[test]
    fn existing_size_of_missing_file_is_zero() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(existing_size(&dir.path().join("missing")).unwrap(), 0);
        let path = dir.path().join("five");
        std::fs::write(&path, b"12345").unwrap();
        assert_eq!(existing_size(&path).unwrap(), 5);
    }
}
