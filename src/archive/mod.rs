//! Gzip-tar archive extraction with nested segment decompression.
//!
//! Uploads arrive as a single gzip-compressed tar on disk. Extraction is
//! streamed entry by entry; a failing entry is logged and skipped so one
//! bad file does not abort the rest of the archive. Entries carrying the
//! block-compression suffix (`.zst`) are expanded in place and the
//! compressed original deleted.

use flate2::read::GzDecoder;
use std::fs::File;
use std::path::Path;

use crate::config;
use crate::error::{Error, Result};

/// Extract `archive_path` into `target`. Returns whether at least one
/// entry was written. Failure to open or read the archive itself is an
/// error; per-entry failures are logged and skipped.
pub fn extract_archive(archive_path: &Path, target: &Path) -> Result<bool> {
    tracing::info!(archive = %archive_path.display(), "extracting upload archive");

    let file = File::open(archive_path)
        .map_err(|e| Error::Archive(format!("failed to open archive: {e}")))?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    archive.set_preserve_permissions(true);

    let entries = archive
        .entries()
        .map_err(|e| Error::Archive(format!("failed to read archive: {e}")))?;

    let mut wrote_any = false;
    for entry in entries {
        let mut entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                // The tar stream itself is broken; nothing further can be read.
                tracing::error!("archive stream error: {e}");
                break;
            }
        };

        let name = match entry.path() {
            Ok(p) => p.into_owned(),
            Err(e) => {
                tracing::error!("skipping entry with unreadable path: {e}");
                continue;
            }
        };

        match entry.unpack_in(target) {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(entry = %name.display(), "entry escapes target directory, skipped");
                continue;
            }
            Err(e) => {
                tracing::error!(entry = %name.display(), "failed to unpack entry: {e}");
                continue;
            }
        }

        let written = target.join(&name);
        if !written.is_file() {
            continue;
        }
        tracing::info!(entry = %name.display(), "extracted file");
        wrote_any = true;

        if written
            .to_string_lossy()
            .ends_with(config::ZSTD_EXT)
        {
            expand_compressed(&written);
        }
    }

    Ok(wrote_any)
}

/// Decompress a `.zst` file into a sibling with the suffix stripped, then
/// delete the compressed original. Failures keep the original in place.
fn expand_compressed(path: &Path) {
    tracing::info!(file = %path.display(), "decompressing zst segment");

    let expanded = path.with_extension("");
    match decompress_into(path, &expanded) {
        Ok(()) => {
            tracing::info!(file = %expanded.display(), "decompressed segment");
            if let Err(e) = std::fs::remove_file(path) {
                tracing::error!(file = %path.display(), "failed to delete zst file: {e}");
            }
        }
        Err(e) => {
            tracing::error!(file = %path.display(), "failed to decompress zst file: {e}");
            let _ = std::fs::remove_file(&expanded);
        }
    }
}

fn decompress_into(src: &Path, dst: &Path) -> std::io::Result<()> {
    let input = File::open(src)?;
    let output = File::create(dst)?;
    zstd::stream::copy_decode(input, output)
}

/// Build a gzip-tar archive from in-memory files. Used by ingestion tests
/// and kept here so the wire format has one owner.
#[cfg(test)]
pub fn build_archive(files: &[(&str, &[u8])]) -> Vec<u8> {
    use flate2::write::GzEncoder;
    use flate2::Compression;

    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, data) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, *data).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}
