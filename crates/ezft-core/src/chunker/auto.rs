//! Chunk size derived from the amount left to download.

const MIB: u64 = 1024 * 1024;
const GIB: u64 = 1024 * MIB;

/// Step function: larger downloads get larger chunks.
///
/// | remaining  | chunk   |
/// |------------|---------|
/// | <= 100 MiB | 4 MiB   |
/// | <= 1 GiB   | 10 MiB  |
/// | <= 10 GiB  | 20 MiB  |
/// | <= 100 GiB | 50 MiB  |
/// | larger     | 100 MiB |
pub fn auto_chunk_size(remaining: u64) -> u64 {
    match remaining {
        r if r > 100 * GIB => 100 * MIB,
        r if r > 10 * GIB => 50 * MIB,
        r if r > GIB => 20 * MIB,
        r if r > 100 * MIB => 10 * MIB,
        _ => 4 * MIB,
    }
}
