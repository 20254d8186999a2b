//! Snapshot archive expansion.

use crate::domain::ArchiveError;
use flate2::read::GzDecoder;
use std::path::Path;
use tar::Archive;

/// Expand a gzipped tarball into `dest`, preserving relative paths verbatim.
/// `dest` is created if missing; entries escaping it are rejected by the
/// tar unpacker.
pub fn unpack_tgz(bytes: &[u8], dest: &Path) -> Result<(), ArchiveError> {
    std::fs::create_dir_all(dest)?;
    let decoder = GzDecoder::new(bytes);
    let mut archive = Archive::new(decoder);
    archive.unpack(dest)?;
    Ok(())
}
