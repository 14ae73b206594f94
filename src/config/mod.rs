mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Route serving the owner/asset listing.
pub const ROUTE_CLIENT_LIST: &str = "/hls/clients";

/// Route accepting track metadata uploads.
pub const ROUTE_METADATA_UPLOAD: &str = "/toml/upload";

/// Response header carrying the generated asset identifier.
pub const CLIENT_ID_HEADER: &str = "Client-ID";

/// Value of the `Server` response header.
pub const SERVER_NAME: &str = "Wavy Server";

/// Suffix appended to the asset id for the staged upload archive.
pub const ARCHIVE_SUFFIX: &str = ".tar.gz";

pub const PLAYLIST_EXT: &str = ".m3u8";
pub const TRANSPORT_STREAM_EXT: &str = ".ts";
pub const M4S_EXT: &str = ".m4s";
pub const MP4_EXT: &str = ".mp4";
pub const METADATA_EXT: &str = ".toml";
pub const ZSTD_EXT: &str = ".zst";

/// Marker preceding the metadata document in a `/toml/upload` body.
pub const METADATA_TOP_BOUNDARY: &str = "===WAVY-METADATA===";

/// Run of dashes terminating the metadata document.
pub const METADATA_BOTTOM_BOUNDARY: &str = "--------------------------";

pub const MEDIA_TYPE_PLAYLIST: &str = "application/vnd.apple.mpegurl";
pub const MEDIA_TYPE_TRANSPORT_STREAM: &str = "video/mp2t";
pub const MEDIA_TYPE_OCTET_STREAM: &str = "application/octet-stream";

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = ["./wavy.toml", "/etc/wavy/config.toml"];

    for path_str in default_paths {
        let path = Path::new(path_str);
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    // Promotion relies on same-filesystem renames between the two trees.
    if config.storage.root.parent() != config.storage.temp_root.parent() {
        anyhow::bail!(
            "Storage root {:?} and temp root {:?} must share a parent directory",
            config.storage.root,
            config.storage.temp_root
        );
    }

    Ok(())
}
