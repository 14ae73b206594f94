//! Storage tree layout and resolution.
//!
//! Promoted content lives in a two-level hierarchy:
//! `<storage-root>/<owner>/<asset-id>/<file>`. Owners are peer addresses,
//! asset ids are UUIDs, and files are flat within an asset. Content is
//! persistent: assets from previous server runs stay servable until the
//! filesystem removes them.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config;
use crate::error::{Error, Result};

/// Directory holding one asset's files.
pub fn asset_dir(root: &Path, owner: &str, asset_id: &str) -> PathBuf {
    root.join(owner).join(asset_id)
}

/// Full path of one file inside an asset.
pub fn segment_path(root: &Path, owner: &str, asset_id: &str, file: &str) -> PathBuf {
    asset_dir(root, owner, asset_id).join(file)
}

/// Media type served for a stored file, chosen by extension.
/// Case-sensitive; anything unrecognized is served as an octet stream.
pub fn media_type_for(name: &str) -> &'static str {
    if name.ends_with(config::PLAYLIST_EXT) {
        config::MEDIA_TYPE_PLAYLIST
    } else if name.ends_with(config::TRANSPORT_STREAM_EXT) {
        config::MEDIA_TYPE_TRANSPORT_STREAM
    } else {
        config::MEDIA_TYPE_OCTET_STREAM
    }
}

/// Render the owner/asset listing: each owner directory on its own line,
/// followed by its asset ids indented with a `- ` prefix.
///
/// Returns `Ok(None)` when the storage root is missing or holds no owner
/// directories; the caller maps that to 404. A storage root that exists
/// but is not a directory is a server error.
pub fn render_listing(root: &Path) -> Result<Option<String>> {
    if !root.exists() {
        return Ok(None);
    }
    if !root.is_dir() {
        return Err(Error::Internal(format!(
            "storage root is not a directory: {}",
            root.display()
        )));
    }

    let mut out = String::new();
    let mut owners_found = false;

    for owner_entry in fs::read_dir(root)? {
        let owner_entry = owner_entry?;
        if !owner_entry.path().is_dir() {
            continue;
        }
        owners_found = true;
        out.push_str(&owner_entry.file_name().to_string_lossy());
        out.push_str(":\n");

        let mut assets_found = false;
        for asset_entry in fs::read_dir(owner_entry.path())? {
            let asset_entry = asset_entry?;
            if !asset_entry.path().is_dir() {
                continue;
            }
            out.push_str("  - ");
            out.push_str(&asset_entry.file_name().to_string_lossy());
            out.push('\n');
            assets_found = true;
        }

        if !assets_found {
            out.push_str("  (no assets)\n");
        }
    }

    if !owners_found {
        tracing::warn!(root = %root.display(), "no owners found in storage");
        return Ok(None);
    }

    Ok(Some(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_type_mapping() {
        assert_eq!(media_type_for("index.m3u8"), "application/vnd.apple.mpegurl");
        assert_eq!(media_type_for("seg_0.ts"), "video/mp2t");
        assert_eq!(media_type_for("seg_0.m4s"), "application/octet-stream");
        assert_eq!(media_type_for("metadata.toml"), "application/octet-stream");
        // Case-sensitive on purpose.
        assert_eq!(media_type_for("INDEX.M3U8"), "application/octet-stream");
    }

    #[test]
    fn segment_path_layout() {
        let path = segment_path(Path::new("/srv/hls"), "10.0.0.1", "abc", "index.m3u8");
        assert_eq!(path, Path::new("/srv/hls/10.0.0.1/abc/index.m3u8"));
    }

    #[test]
    fn listing_missing_root_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let listing = render_listing(&dir.path().join("absent")).unwrap();
        assert!(listing.is_none());
    }

    #[test]
    fn listing_empty_root_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let listing = render_listing(dir.path()).unwrap();
        assert!(listing.is_none());
    }

    #[test]
    fn listing_file_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("root");
        fs::write(&file, b"x").unwrap();
        assert!(render_listing(&file).is_err());
    }

    #[test]
    fn listing_renders_owners_and_assets() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("10.0.0.1/asset-a")).unwrap();
        fs::create_dir_all(dir.path().join("10.0.0.1/asset-b")).unwrap();
        fs::create_dir_all(dir.path().join("10.0.0.2")).unwrap();

        let listing = render_listing(dir.path()).unwrap().unwrap();
        assert!(listing.contains("10.0.0.1:\n"));
        assert!(listing.contains("  - asset-a\n"));
        assert!(listing.contains("  - asset-b\n"));
        assert!(listing.contains("10.0.0.2:\n"));
        assert!(listing.contains("  (no assets)\n"));
    }

    #[test]
    fn listing_ignores_stray_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("stray.txt"), b"x").unwrap();
        let listing = render_listing(dir.path()).unwrap();
        assert!(listing.is_none());
    }
}
