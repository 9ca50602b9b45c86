//! Boundary to the external download engine.
//!
//! The engine speaks in sentinels: `0` for a failed registration, `false` for a
//! refused command and `None` where the native side hands back a null pointer.
//! Everything here mirrors that surface one-to-one; translation into typed
//! results happens in [`crate::gateway`] and nowhere else.

use crate::registry::ControllerHandle;

/// Raw per-file record as reported by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFileInfo {
    /// One-based file ordinal.
    pub index: i32,
    /// Path as reported by the engine, usually absolute under the download dir.
    pub path: String,
    /// File size in bytes.
    pub length: i64,
    /// Bytes completed for the file.
    pub completed_length: i64,
    /// Whether the file is selected for download.
    pub selected: bool,
}

/// Raw session snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDownloadInfo {
    /// Numeric status code.
    pub status: i32,
    /// Total bytes, zero while unknown.
    pub total_length: i64,
    /// Bytes downloaded.
    pub bytes_completed: i64,
    /// Bytes uploaded.
    pub upload_length: i64,
    /// Download speed in bytes per second.
    pub download_speed: i32,
    /// Upload speed in bytes per second.
    pub upload_speed: i32,
    /// Piece length in bytes.
    pub piece_length: i64,
    /// Number of pieces.
    pub num_pieces: i32,
    /// Connected peers or servers.
    pub connections: i32,
    /// Hex-encoded piece bitfield.
    pub bit_field: String,
    /// Download directory of the session.
    pub dir: String,
    /// Torrent name, empty otherwise.
    pub name: String,
    /// Files of the session.
    pub files: Vec<RawFileInfo>,
}

/// Raw torrent meta information.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawMetaInfo {
    /// Declared torrent name.
    pub name: String,
    /// Torrent comment.
    pub comment: String,
    /// Creation time as Unix seconds.
    pub creation_unix: i64,
    /// Announce URLs across every tier, joined by `;`.
    pub announce_list: String,
    /// Payload layout: `0` unknown, `1` single file, `2` multi file.
    pub mode: i32,
}

/// Raw result of a torrent parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTorrentInfo {
    /// Raw info hash bytes.
    pub info_hash: Vec<u8>,
    /// Directory file paths are reported under.
    pub dir: String,
    /// Meta information, absent when the engine could not provide it.
    pub meta: Option<RawMetaInfo>,
    /// Files in the torrent.
    pub files: Vec<RawFileInfo>,
}

/// Operations the external engine exposes.
///
/// Implementations must accept command submission from application threads
/// while [`NativeEngine::start`] runs on its own thread. Lifecycle events are
/// reported by calling [`crate::bridge::notify_event`] with the handle passed to
/// [`NativeEngine::init`].
pub trait NativeEngine: Send + Sync {
    /// Initialise the engine session. Returns `0` on success.
    fn init(&self, handle: ControllerHandle, global_options: &str) -> i32;
    /// Run the engine loop; blocks until the engine shuts down.
    fn start(&self);
    /// Finalise the engine session. Returns `0` on success.
    fn deinit(&self) -> i32;
    /// Register a URI download. Returns `0` on failure.
    fn add_uri(&self, uri: &str, options: &str) -> u64;
    /// Read a torrent file without registering a download.
    fn parse_torrent(&self, path: &str) -> Option<RawTorrentInfo>;
    /// Register a torrent download. Returns `0` on failure.
    fn add_torrent(&self, path: &str, options: &str) -> u64;
    /// Change per-session options.
    fn change_options(&self, id: u64, options: &str) -> bool;
    /// Read per-session options.
    fn get_options(&self, id: u64) -> Option<String>;
    /// Change engine-wide options.
    fn change_global_options(&self, options: &str) -> bool;
    /// Read engine-wide options.
    fn get_global_options(&self) -> String;
    /// Pause a session.
    fn pause(&self, id: u64) -> bool;
    /// Resume a paused session.
    fn resume(&self, id: u64) -> bool;
    /// Remove a session, stopping both download and seeding.
    fn remove_download(&self, id: u64) -> bool;
    /// Snapshot a session.
    fn get_download_info(&self, id: u64) -> Option<RawDownloadInfo>;
}
