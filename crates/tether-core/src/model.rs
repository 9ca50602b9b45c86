//! Snapshot and metadata types produced by the engine gateway.

use serde::{Deserialize, Serialize};

use crate::error::{ControllerError, ControllerResult};

/// Closed set of session states reported by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    /// Transferring data.
    Active,
    /// Queued behind other sessions. Also the status of an unknown session.
    #[default]
    Waiting,
    /// Paused by the application.
    Paused,
    /// Finished successfully.
    Complete,
    /// Stopped on an error.
    Error,
    /// Removed from the engine.
    Removed,
}

impl DownloadStatus {
    /// Numeric code used by the engine for this status.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Active => 0,
            Self::Waiting => 1,
            Self::Paused => 2,
            Self::Complete => 3,
            Self::Error => 4,
            Self::Removed => 5,
        }
    }

    /// Whether the session can no longer change state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error | Self::Removed)
    }

    /// Map an engine status code onto the closed enumeration.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::UnknownStatus`] for codes outside `0..=5`.
    pub const fn from_code(code: i32) -> ControllerResult<Self> {
        match code {
            0 => Ok(Self::Active),
            1 => Ok(Self::Waiting),
            2 => Ok(Self::Paused),
            3 => Ok(Self::Complete),
            4 => Ok(Self::Error),
            5 => Ok(Self::Removed),
            other => Err(ControllerError::UnknownStatus { code: other }),
        }
    }
}

/// A file inside a torrent or a live torrent session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Stable ordinal within the torrent, starting at 1.
    pub index: u32,
    /// Path relative to the download directory.
    pub name: String,
    /// File size in bytes.
    pub length: u64,
    /// Whether the file is selected for download.
    pub selected: bool,
    /// Bytes completed for this file; zero outside a live session.
    pub completed_length: u64,
}

/// Immutable point-in-time view of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadInfo {
    /// Session state.
    pub status: DownloadStatus,
    /// Total bytes; zero until the engine knows the transfer size.
    pub total_length: u64,
    /// Bytes downloaded so far.
    pub bytes_completed: u64,
    /// Bytes uploaded so far.
    pub bytes_uploaded: u64,
    /// Download speed in bytes per second.
    pub download_speed: u64,
    /// Upload speed in bytes per second.
    pub upload_speed: u64,
    /// Piece length in bytes.
    pub piece_length: u64,
    /// Number of pieces.
    pub num_pieces: u64,
    /// Connected peers or servers.
    pub connections: u32,
    /// Hex-encoded piece bitfield, empty when unknown.
    pub bit_field: String,
    /// Torrent name when the session is a torrent download.
    pub name: Option<String>,
    /// Per-file records for torrent sessions.
    pub files: Vec<FileRecord>,
}

impl DownloadInfo {
    /// Whether the engine knows how large the transfer is.
    #[must_use]
    pub const fn has_metadata(&self) -> bool {
        self.total_length > 0
    }

    /// Percentage downloaded, `0.0` while the size is unknown.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn progress_percent(&self) -> f64 {
        if self.total_length == 0 {
            0.0
        } else {
            (self.bytes_completed as f64 / self.total_length as f64) * 100.0
        }
    }

    /// Name to show for the session: declared name, else the first file's name.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        resolve_display_name(self.name.as_deref(), &self.files)
    }
}

/// Layout of a torrent's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorrentMode {
    /// Single-file torrent.
    Single,
    /// Multi-file torrent rooted at a directory.
    Multi,
}

/// Metadata read from a torrent file without creating a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorrentMetadata {
    /// Lowercase hex of the info hash.
    pub info_hash: String,
    /// Declared torrent name.
    pub name: Option<String>,
    /// Flattened announce list, in tier order.
    pub announce_list: Vec<String>,
    /// Free-form comment.
    pub comment: String,
    /// Creation time as Unix seconds, zero when absent.
    pub creation_unix: i64,
    /// Payload layout when reported.
    pub mode: Option<TorrentMode>,
    /// Files in the torrent.
    pub files: Vec<FileRecord>,
}

impl TorrentMetadata {
    /// Name to show for the torrent: declared name, else the first file's name.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        resolve_display_name(self.name.as_deref(), &self.files)
    }

    /// Combined size of every file.
    #[must_use]
    pub fn total_length(&self) -> u64 {
        self.files.iter().map(|file| file.length).sum()
    }
}

fn resolve_display_name<'a>(declared: Option<&'a str>, files: &'a [FileRecord]) -> Option<&'a str> {
    declared
        .filter(|name| !name.is_empty())
        .or_else(|| files.first().map(|file| file.name.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str) -> FileRecord {
        FileRecord {
            index: 1,
            name: name.to_string(),
            length: 10,
            selected: true,
            completed_length: 0,
        }
    }

    #[test]
    fn status_codes_map_both_ways() {
        for code in 0..=5 {
            let status = DownloadStatus::from_code(code).expect("known code");
            assert_eq!(status.code(), code);
        }
        assert_eq!(
            DownloadStatus::from_code(6),
            Err(ControllerError::UnknownStatus { code: 6 })
        );
        assert_eq!(
            DownloadStatus::from_code(-1),
            Err(ControllerError::UnknownStatus { code: -1 })
        );
    }

    #[test]
    fn default_snapshot_has_no_metadata() {
        let info = DownloadInfo::default();
        assert!(!info.has_metadata());
        assert!(info.progress_percent().abs() < f64::EPSILON);
        assert_eq!(info.display_name(), None);
    }

    #[test]
    fn progress_percent_uses_total_length() {
        let info = DownloadInfo {
            total_length: 200,
            bytes_completed: 50,
            ..DownloadInfo::default()
        };
        assert!((info.progress_percent() - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn display_name_prefers_declared_name() {
        let meta = TorrentMetadata {
            name: Some("ubuntu".to_string()),
            files: vec![file("ubuntu/disk.iso")],
            ..TorrentMetadata::default()
        };
        assert_eq!(meta.display_name(), Some("ubuntu"));
    }

    #[test]
    fn display_name_falls_back_to_first_file() {
        let meta = TorrentMetadata {
            name: Some(String::new()),
            files: vec![file("first.iso"), file("second.iso")],
            ..TorrentMetadata::default()
        };
        assert_eq!(meta.display_name(), Some("first.iso"));
        assert_eq!(meta.total_length(), 20);

        let info = DownloadInfo {
            files: vec![file("first.iso")],
            ..DownloadInfo::default()
        };
        assert_eq!(info.display_name(), Some("first.iso"));
    }
}
