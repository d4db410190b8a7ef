//! Checksum command: compute SHA-256 of a file.

use anyhow::Result;
use ezft_core::checksum;
use std::path::Path;

/// Print `<digest>  <path>`; with `expect`, fail on mismatch.
pub async fn run_checksum(path: &Path, expect: Option<&str>) -> Result<()> {
    let digest = checksum::sha256_path(path)?;
    println!("{}  {}", digest, path.display());
    if let Some(expected) = expect {
        checksum::verify_sha256(path, expected)?;
        println!("OK");
    }
    Ok(())
}
