//! Track metadata documents attached to uploads.
//!
//! Clients POST a TOML document describing the audio behind an upload to
//! `/toml/upload`, framed between a top boundary marker and a run of
//! dashes. The server strips the framing, parses the document, and
//! acknowledges it. Nothing is persisted here.

use serde::Deserialize;

use crate::config;
use crate::error::{Error, Result};

#[derive(Debug, Default, Clone, Deserialize)]
pub struct TrackMetadata {
    #[serde(default)]
    pub audio: AudioInfo,

    #[serde(default)]
    pub tags: TrackTags,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct AudioInfo {
    /// Source path of the encoded audio on the uploader's side. A parse
    /// that yields an empty path is treated as a failed parse.
    #[serde(default)]
    pub path: String,

    #[serde(default)]
    pub bitrate: u32,

    #[serde(default)]
    pub codec: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct TrackTags {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub artist: Option<String>,

    #[serde(default)]
    pub album: Option<String>,

    #[serde(default)]
    pub year: Option<u16>,
}

/// Strip the upload framing: everything through the top boundary marker
/// and everything from the bottom run-of-dashes onward. Either boundary
/// may be absent.
pub fn strip_boundaries(body: &str) -> &str {
    let mut doc = body;
    if let Some(pos) = doc.find(config::METADATA_TOP_BOUNDARY) {
        doc = &doc[pos + config::METADATA_TOP_BOUNDARY.len()..];
    }
    if let Some(pos) = doc.find(config::METADATA_BOTTOM_BOUNDARY) {
        doc = &doc[..pos];
    }
    doc
}

/// Parse a stripped metadata document. An unparsable document or one
/// without an audio path is a validation failure.
pub fn parse(doc: &str) -> Result<TrackMetadata> {
    let metadata: TrackMetadata = toml::from_str(doc)
        .map_err(|e| Error::Validation(format!("failed to parse metadata: {e}")))?;

    if metadata.audio.path.is_empty() {
        return Err(Error::Validation("metadata has no audio path".into()));
    }

    Ok(metadata)
}
