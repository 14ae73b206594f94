//! Upload ingestion: staging extraction, validator sweep, promotion.
//!
//! The staged archive is extracted into a per-asset directory under the
//! temp root, every extracted file is checked against its format
//! validator, and the survivors are renamed one by one into the owner's
//! asset directory. The temp root and storage root share a parent, so
//! every rename is a same-filesystem move.

use std::fs;
use std::path::Path;

use crate::archive;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::storage;
use crate::validate::{self, FileKind};

/// Extract, validate, and promote a staged upload archive. Returns the
/// number of files promoted into `<storage-root>/<owner>/<asset_id>/`.
///
/// The staging directory is always removed before returning; removal of
/// the archive file itself is the caller's responsibility.
pub fn ingest_archive(
    config: &Config,
    archive_path: &Path,
    asset_id: &str,
    owner: &str,
) -> Result<usize> {
    tracing::info!(%owner, %asset_id, "validating and extracting upload");

    if !archive_path.exists() {
        return Err(Error::Archive("uploaded archive does not exist".into()));
    }

    let staging = config.storage.temp_root.join(asset_id);
    fs::create_dir_all(&staging)?;

    let outcome = extract_and_promote(config, archive_path, &staging, asset_id, owner);

    if let Err(e) = fs::remove_dir_all(&staging) {
        tracing::error!(staging = %staging.display(), "failed to remove staging dir: {e}");
    }

    outcome
}

fn extract_and_promote(
    config: &Config,
    archive_path: &Path,
    staging: &Path,
    asset_id: &str,
    owner: &str,
) -> Result<usize> {
    if !archive::extract_archive(archive_path, staging)? {
        return Err(Error::Archive("no files extracted from archive".into()));
    }

    tracing::info!(%asset_id, "extraction complete, validating files");

    let dest = storage::asset_dir(&config.storage.root, owner, asset_id);
    fs::create_dir_all(&dest)?;

    let mut promoted = 0;
    for entry in fs::read_dir(staging)? {
        let entry = entry?;
        let path = entry.path();
        // The sweep is non-recursive; an archive that produced
        // subdirectories surfaces as missing files here.
        if !path.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();

        match validate::classify(&name) {
            FileKind::Playlist => {
                let data = fs::read(&path)?;
                if !validate::is_valid_playlist(&data) {
                    tracing::warn!(file = %name, "invalid playlist, removing");
                    fs::remove_file(&path)?;
                    continue;
                }
            }
            FileKind::TransportStream => {
                let data = fs::read(&path)?;
                if !validate::is_valid_transport_stream(&data) {
                    tracing::warn!(file = %name, "invalid transport stream, removing");
                    fs::remove_file(&path)?;
                    continue;
                }
            }
            FileKind::FragmentedMp4 => {
                if !validate::is_valid_fragmented_mp4(&path) {
                    tracing::warn!(file = %name, "possibly invalid m4s segment, keeping");
                }
            }
            FileKind::Container => {
                tracing::debug!(file = %name, "found container file");
            }
            FileKind::Metadata => {
                tracing::debug!(file = %name, "found metadata file");
            }
            FileKind::Other => {
                tracing::warn!(file = %name, "skipping unknown file");
                fs::remove_file(&path)?;
                continue;
            }
        }

        fs::rename(&path, dest.join(&name))?;
        tracing::info!(file = %name, "file promoted to storage");
        promoted += 1;
    }

    if promoted == 0 {
        // No asset directory may exist for a failed upload.
        let _ = fs::remove_dir(&dest);
        tracing::error!(%asset_id, "no valid files remain after validation");
        return Err(Error::Archive("no valid files after validation".into()));
    }

    tracing::info!(%asset_id, promoted, "extraction and validation successful");
    Ok(promoted)
}
