//! Per-file format checks applied during the staging sweep.
//!
//! Each validator is a function of bytes (or a path) to a boolean verdict.
//! Rejections are logged here; the sweep in [`crate::ingest`] decides what
//! a rejection means for the file (delete vs. keep-with-warning).

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::config;

/// MPEG-TS sync byte opening every transport-stream packet.
pub const TS_SYNC_BYTE: u8 = 0x47;

/// Global header marker required in every HLS playlist.
pub const PLAYLIST_HEADER: &[u8] = b"#EXTM3U";

/// File classes recognized by the staging sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Playlist,
    TransportStream,
    FragmentedMp4,
    Container,
    Metadata,
    Other,
}

/// Classify a file name by extension. Case-sensitive.
pub fn classify(name: &str) -> FileKind {
    if name.ends_with(config::PLAYLIST_EXT) {
        FileKind::Playlist
    } else if name.ends_with(config::TRANSPORT_STREAM_EXT) {
        FileKind::TransportStream
    } else if name.ends_with(config::M4S_EXT) {
        FileKind::FragmentedMp4
    } else if name.ends_with(config::MP4_EXT) {
        FileKind::Container
    } else if name.ends_with(config::METADATA_EXT) {
        FileKind::Metadata
    } else {
        FileKind::Other
    }
}

/// A playlist is accepted iff it contains the `#EXTM3U` header anywhere.
pub fn is_valid_playlist(data: &[u8]) -> bool {
    contains(data, PLAYLIST_HEADER)
}

/// A transport-stream segment is accepted iff it is non-empty and starts
/// with the MPEG-TS sync byte.
pub fn is_valid_transport_stream(data: &[u8]) -> bool {
    data.first() == Some(&TS_SYNC_BYTE)
}

/// Inspect a fragmented-MP4 segment: the file must open, carry an `ftyp`
/// box at offset 4, and contain both `moof` and `mdat` somewhere.
pub fn is_valid_fragmented_mp4(path: &Path) -> bool {
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            tracing::error!(path = %path.display(), "failed to open m4s file: {e}");
            return false;
        }
    };

    // 12 bytes covers the box size, box type, and major brand.
    let mut header = [0u8; 12];
    if file.read_exact(&mut header).is_err() {
        tracing::error!(path = %path.display(), "m4s file too small");
        return false;
    }

    let box_size = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
    let box_type = &header[4..8];
    if box_type != b"ftyp" {
        tracing::error!(path = %path.display(), "missing ftyp header in m4s");
        return false;
    }
    tracing::trace!(path = %path.display(), box_size, "ftyp box present");

    let mut content = header.to_vec();
    if let Err(e) = file.read_to_end(&mut content) {
        tracing::error!(path = %path.display(), "failed to read m4s file: {e}");
        return false;
    }

    if !contains(&content, b"moof") || !contains(&content, b"mdat") {
        tracing::error!(path = %path.display(), "m4s segment missing moof or mdat box");
        return false;
    }

    tracing::info!(path = %path.display(), "valid m4s segment");
    true
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_by_extension() {
        assert_eq!(classify("index.m3u8"), FileKind::Playlist);
        assert_eq!(classify("hls_mp3_64_0.ts"), FileKind::TransportStream);
        assert_eq!(classify("seg_1.m4s"), FileKind::FragmentedMp4);
        assert_eq!(classify("movie.mp4"), FileKind::Container);
        assert_eq!(classify("metadata.toml"), FileKind::Metadata);
        assert_eq!(classify("notes.txt"), FileKind::Other);
        // Case-sensitive on purpose.
        assert_eq!(classify("INDEX.M3U8"), FileKind::Other);
    }

    #[test]
    fn playlist_requires_header() {
        assert!(is_valid_playlist(b"#EXTM3U\n#EXT-X-VERSION:3\n"));
        assert!(is_valid_playlist(b"junk before\n#EXTM3U\n"));
        assert!(!is_valid_playlist(b"#EXT-X-VERSION:3\n"));
        assert!(!is_valid_playlist(b""));
    }

    #[test]
    fn transport_stream_requires_sync_byte() {
        assert!(is_valid_transport_stream(&[0x47, 0x40, 0x00]));
        assert!(!is_valid_transport_stream(&[0x00, 0x47]));
        assert!(!is_valid_transport_stream(&[]));
    }

    fn fmp4_bytes(box_type: &[u8; 4], with_moof: bool, with_mdat: bool) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&24u32.to_be_bytes());
        data.extend_from_slice(box_type);
        data.extend_from_slice(b"iso5");
        if with_moof {
            data.extend_from_slice(b"\x00\x00\x00\x08moof");
        }
        if with_mdat {
            data.extend_from_slice(b"\x00\x00\x00\x08mdat");
        }
        data
    }

    #[test]
    fn fmp4_accepts_ftyp_moof_mdat() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seg.m4s");
        std::fs::write(&path, fmp4_bytes(b"ftyp", true, true)).unwrap();
        assert!(is_valid_fragmented_mp4(&path));
    }

    #[test]
    fn fmp4_rejects_wrong_box_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seg.m4s");
        std::fs::write(&path, fmp4_bytes(b"moov", true, true)).unwrap();
        assert!(!is_valid_fragmented_mp4(&path));
    }

    #[test]
    fn fmp4_rejects_missing_fragment_boxes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seg.m4s");
        std::fs::write(&path, fmp4_bytes(b"ftyp", true, false)).unwrap();
        assert!(!is_valid_fragmented_mp4(&path));
        std::fs::write(&path, fmp4_bytes(b"ftyp", false, true)).unwrap();
        assert!(!is_valid_fragmented_mp4(&path));
    }

    #[test]
    fn fmp4_rejects_short_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seg.m4s");
        std::fs::write(&path, b"tiny").unwrap();
        assert!(!is_valid_fragmented_mp4(&path));
    }
}
