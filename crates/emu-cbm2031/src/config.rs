//! CBM 2031 configuration: the DOS ROM images.

use std::fs;
use std::path::Path;

/// Size of each of the two DOS ROM images.
pub const ROM_SIZE: usize = 8 * 1024;

/// Configuration for constructing a CBM 2031 instance.
pub struct Cbm2031Config {
    /// DOS ROM mapped at $C000 (8,192 bytes).
    pub low_rom: Vec<u8>,
    /// DOS ROM mapped at $E000 (8,192 bytes).
    pub high_rom: Vec<u8>,
}

/// Load one 8 KiB ROM image from disk.
pub fn load_rom<P: AsRef<Path>>(path: P) -> Result<Vec<u8>, String> {
    let path = path.as_ref();
    let data = fs::read(path).map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    if data.len() != ROM_SIZE {
        return Err(format!(
            "{}: expected {ROM_SIZE} bytes, got {}",
            path.display(),
            data.len()
        ));
    }
    Ok(data)
}
