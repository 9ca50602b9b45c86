//! Typed wrapper over every engine operation.
//!
//! # Design
//! - One method per engine call; no state besides the engine and metrics.
//! - Sentinels from [`NativeEngine`] (`0`, `false`, `None`) become
//!   [`ControllerError`] values here and never travel further.
//! - Refused lifecycle transitions stay `false`; they are not errors.

use std::path::Path;
use std::sync::Arc;

use tether_core::options::{self, OptionSet};
use tether_core::{
    ControllerError, ControllerResult, DownloadInfo, DownloadStatus, FileRecord, Gid, OptionScope,
    TorrentMetadata, TorrentMode,
};
use tether_telemetry::{CommandOutcome, Metrics};
use tracing::{debug, warn};

use crate::native::{NativeEngine, RawDownloadInfo, RawFileInfo, RawTorrentInfo};
use crate::registry::ControllerHandle;

/// Typed façade over a [`NativeEngine`].
#[derive(Clone)]
pub struct EngineGateway {
    engine: Arc<dyn NativeEngine>,
    metrics: Option<Metrics>,
}

impl EngineGateway {
    /// Wrap `engine`, recording command outcomes on `metrics` when present.
    #[must_use]
    pub const fn new(engine: Arc<dyn NativeEngine>, metrics: Option<Metrics>) -> Self {
        Self { engine, metrics }
    }

    /// Initialise the engine session with the given global options.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::MalformedOptions`] if the options cannot be
    /// encoded and [`ControllerError::EngineInit`] if the engine fails.
    pub fn init(&self, handle: ControllerHandle, global_options: &OptionSet) -> ControllerResult<()> {
        let wire = options::encode(global_options)?;
        let code = self.engine.init(handle, &wire);
        if code == 0 {
            self.record("init", CommandOutcome::Accepted);
            Ok(())
        } else {
            self.record("init", CommandOutcome::Failed);
            warn!(code, "engine initialisation failed");
            Err(ControllerError::EngineInit { code })
        }
    }

    /// Run the engine loop on the calling thread until the engine shuts down.
    pub fn run(&self) {
        self.engine.start();
    }

    /// Finalise the engine session.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::EngineShutdown`] when the engine reports a
    /// non-zero code.
    pub fn deinit(&self) -> ControllerResult<()> {
        let code = self.engine.deinit();
        if code == 0 {
            self.record("deinit", CommandOutcome::Accepted);
            Ok(())
        } else {
            self.record("deinit", CommandOutcome::Failed);
            warn!(code, "engine shutdown failed");
            Err(ControllerError::EngineShutdown { code })
        }
    }

    /// Register a URI download with per-session options.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::AddFailed`] when the engine rejects the URI.
    pub fn add_uri(&self, uri: &str, options: &OptionSet) -> ControllerResult<Gid> {
        let wire = options::encode(options)?;
        let id = self.engine.add_uri(uri, &wire);
        self.registered("add_uri", uri, id)
    }

    /// Read a torrent file without creating a session.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::ParseFailed`] when the file is unreadable or
    /// not a valid torrent.
    pub fn parse_torrent(&self, path: &Path) -> ControllerResult<TorrentMetadata> {
        let target = path.display().to_string();
        let Some(raw) = self.engine.parse_torrent(&target) else {
            self.record("parse_torrent", CommandOutcome::Failed);
            warn!(path = %target, "torrent parse failed");
            return Err(ControllerError::ParseFailed { path: target });
        };
        self.record("parse_torrent", CommandOutcome::Accepted);
        Ok(convert_torrent(raw))
    }

    /// Register a torrent download.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::AddFailed`] when the engine rejects the
    /// torrent.
    pub fn add_torrent(&self, path: &Path, options: &OptionSet) -> ControllerResult<Gid> {
        let wire = options::encode(options)?;
        let target = path.display().to_string();
        let id = self.engine.add_torrent(&target, &wire);
        self.registered("add_torrent", &target, id)
    }

    /// Change options of one session.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::OptionChangeFailed`] when the session is
    /// unknown, terminal, or the engine rejects the values.
    pub fn change_options(&self, gid: Gid, options: &OptionSet) -> ControllerResult<()> {
        let wire = options::encode(options)?;
        if self.engine.change_options(gid.as_raw(), &wire) {
            self.record("change_options", CommandOutcome::Accepted);
            Ok(())
        } else {
            self.record("change_options", CommandOutcome::Failed);
            warn!(gid = %gid, "session option change rejected");
            Err(ControllerError::OptionChangeFailed {
                scope: OptionScope::Session,
                gid: Some(gid.to_string()),
            })
        }
    }

    /// Read options of one session.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::OptionsUnavailable`] when the engine has no
    /// options for the session and [`ControllerError::MalformedOptions`] when
    /// the engine output cannot be decoded.
    pub fn get_options(&self, gid: Gid) -> ControllerResult<OptionSet> {
        let Some(wire) = self.engine.get_options(gid.as_raw()) else {
            self.record("get_options", CommandOutcome::Failed);
            debug!(gid = %gid, "engine returned no session options");
            return Err(ControllerError::OptionsUnavailable {
                gid: gid.to_string(),
            });
        };
        self.record("get_options", CommandOutcome::Accepted);
        options::decode(&wire)
    }

    /// Change engine-wide options.
    ///
    /// Keys listed in [`tether_core::GLOBAL_SCOPE_INVALID_KEYS`] are forwarded
    /// unchanged; the engine decides whether to reject them.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::OptionChangeFailed`] when the engine rejects
    /// the change.
    pub fn change_global_options(&self, options: &OptionSet) -> ControllerResult<()> {
        let invalid = options.global_scope_invalid_keys();
        if !invalid.is_empty() {
            debug!(keys = ?invalid, "forwarding session-only keys at global scope");
        }
        let wire = options::encode(options)?;
        if self.engine.change_global_options(&wire) {
            self.record("change_global_options", CommandOutcome::Accepted);
            Ok(())
        } else {
            self.record("change_global_options", CommandOutcome::Failed);
            warn!("global option change rejected");
            Err(ControllerError::OptionChangeFailed {
                scope: OptionScope::Global,
                gid: None,
            })
        }
    }

    /// Read engine-wide options.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::MalformedOptions`] when the engine output
    /// cannot be decoded.
    pub fn get_global_options(&self) -> ControllerResult<OptionSet> {
        let wire = self.engine.get_global_options();
        self.record("get_global_options", CommandOutcome::Accepted);
        options::decode(&wire)
    }

    /// Pause a session. `false` means the engine refused the transition.
    #[must_use]
    pub fn pause(&self, gid: Gid) -> bool {
        let accepted = self.engine.pause(gid.as_raw());
        self.transition("pause", gid, accepted)
    }

    /// Resume a session. `false` means the engine refused the transition.
    #[must_use]
    pub fn resume(&self, gid: Gid) -> bool {
        let accepted = self.engine.resume(gid.as_raw());
        self.transition("resume", gid, accepted)
    }

    /// Remove a session, stopping download and seeding.
    #[must_use]
    pub fn remove(&self, gid: Gid) -> bool {
        let accepted = self.engine.remove_download(gid.as_raw());
        self.transition("remove", gid, accepted)
    }

    /// Snapshot a session. Unknown sessions yield a zero-valued snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::UnknownStatus`] when the engine reports a
    /// status outside the known codes.
    pub fn download_info(&self, gid: Gid) -> ControllerResult<DownloadInfo> {
        self.engine
            .get_download_info(gid.as_raw())
            .map_or_else(|| Ok(DownloadInfo::default()), convert_download)
    }

    fn registered(&self, operation: &'static str, target: &str, id: u64) -> ControllerResult<Gid> {
        if id == 0 {
            self.record(operation, CommandOutcome::Failed);
            warn!(operation, submitted = target, "engine rejected download");
            return Err(ControllerError::AddFailed {
                operation,
                target: target.to_string(),
            });
        }
        self.record(operation, CommandOutcome::Accepted);
        Ok(Gid::from_raw(id))
    }

    fn transition(&self, operation: &'static str, gid: Gid, accepted: bool) -> bool {
        if accepted {
            self.record(operation, CommandOutcome::Accepted);
        } else {
            self.record(operation, CommandOutcome::Refused);
            debug!(operation, gid = %gid, "engine refused transition");
        }
        accepted
    }

    fn record(&self, operation: &str, outcome: CommandOutcome) {
        if let Some(metrics) = &self.metrics {
            metrics.record_command(operation, outcome);
        }
    }
}

fn unsigned(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn unsigned_i32(value: i32) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn convert_download(raw: RawDownloadInfo) -> ControllerResult<DownloadInfo> {
    let status = DownloadStatus::from_code(raw.status)?;
    let files = convert_files(&raw.dir, raw.files);
    Ok(DownloadInfo {
        status,
        total_length: unsigned(raw.total_length),
        bytes_completed: unsigned(raw.bytes_completed),
        bytes_uploaded: unsigned(raw.upload_length),
        download_speed: unsigned_i32(raw.download_speed),
        upload_speed: unsigned_i32(raw.upload_speed),
        piece_length: unsigned(raw.piece_length),
        num_pieces: unsigned_i32(raw.num_pieces),
        connections: u32::try_from(raw.connections).unwrap_or(0),
        bit_field: raw.bit_field,
        name: Some(raw.name).filter(|name| !name.is_empty()),
        files,
    })
}

fn convert_torrent(raw: RawTorrentInfo) -> TorrentMetadata {
    let files = convert_files(&raw.dir, raw.files);
    let info_hash = hex::encode(raw.info_hash);
    let Some(meta) = raw.meta else {
        return TorrentMetadata {
            info_hash,
            files,
            ..TorrentMetadata::default()
        };
    };
    TorrentMetadata {
        info_hash,
        name: Some(meta.name).filter(|name| !name.is_empty()),
        announce_list: split_announce_list(&meta.announce_list),
        comment: meta.comment,
        creation_unix: meta.creation_unix,
        mode: match meta.mode {
            1 => Some(TorrentMode::Single),
            2 => Some(TorrentMode::Multi),
            _ => None,
        },
        files,
    }
}

fn split_announce_list(joined: &str) -> Vec<String> {
    joined
        .split(options::SEPARATOR)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect()
}

fn convert_files(dir: &str, files: Vec<RawFileInfo>) -> Vec<FileRecord> {
    files
        .into_iter()
        .map(|file| FileRecord {
            index: u32::try_from(file.index).unwrap_or(0),
            name: relative_name(dir, &file.path),
            length: unsigned(file.length),
            selected: file.selected,
            completed_length: unsigned(file.completed_length),
        })
        .collect()
}

fn relative_name(dir: &str, path: &str) -> String {
    if dir.is_empty() {
        return path.to_string();
    }
    Path::new(path)
        .strip_prefix(dir)
        .ok()
        .and_then(|rest| rest.to_str())
        .filter(|rest| !rest.is_empty())
        .unwrap_or(path)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::RawMetaInfo;
    use crate::stub::StubEngine;

    #[test]
    fn announce_list_splits_on_separator() {
        assert!(split_announce_list("").is_empty());
        assert_eq!(
            split_announce_list("udp://a/announce;http://b/announce;"),
            vec!["udp://a/announce", "http://b/announce"]
        );
    }

    #[test]
    fn file_names_are_made_relative_to_dir() {
        assert_eq!(relative_name("/data", "/data/show/e01.mkv"), "show/e01.mkv");
        assert_eq!(relative_name("/data/", "/data/file.iso"), "file.iso");
        assert_eq!(relative_name("/data", "/elsewhere/file.iso"), "/elsewhere/file.iso");
        assert_eq!(relative_name("", "file.iso"), "file.iso");
    }

    #[test]
    fn sibling_dir_sharing_a_prefix_is_left_alone() {
        assert_eq!(relative_name("/data", "/database/movie.mkv"), "/database/movie.mkv");
        assert_eq!(relative_name("/data", "/data"), "/data");
    }

    #[test]
    fn parse_failure_reports_path_and_counts_failure() {
        let metrics = Metrics::new().expect("metrics");
        let gateway = EngineGateway::new(Arc::new(StubEngine::new()), Some(metrics.clone()));
        let path = Path::new("/definitely/missing.torrent");

        let err = gateway.parse_torrent(path).expect_err("missing torrent");
        assert_eq!(
            err,
            ControllerError::ParseFailed {
                path: "/definitely/missing.torrent".to_string()
            }
        );
        assert_eq!(metrics.command_count("parse_torrent", CommandOutcome::Failed), 1);
    }

    #[test]
    fn torrent_conversion_hex_encodes_hash_and_maps_mode() {
        let raw = RawTorrentInfo {
            info_hash: vec![0xab, 0x01, 0xff],
            dir: "/dl".to_string(),
            meta: Some(RawMetaInfo {
                name: String::new(),
                comment: "hello".to_string(),
                creation_unix: 1_700_000_000,
                announce_list: "udp://tracker/announce".to_string(),
                mode: 2,
            }),
            files: vec![RawFileInfo {
                index: 1,
                path: "/dl/album/track.flac".to_string(),
                length: 42,
                completed_length: 0,
                selected: true,
            }],
        };

        let meta = convert_torrent(raw);
        assert_eq!(meta.info_hash, "ab01ff");
        assert_eq!(meta.name, None);
        assert_eq!(meta.display_name(), Some("album/track.flac"));
        assert_eq!(meta.mode, Some(TorrentMode::Multi));
        assert_eq!(meta.announce_list, vec!["udp://tracker/announce"]);
        assert_eq!(meta.total_length(), 42);
    }

    #[test]
    fn torrent_without_meta_keeps_files() {
        let raw = RawTorrentInfo {
            info_hash: vec![0; 2],
            dir: String::new(),
            meta: None,
            files: vec![RawFileInfo {
                index: 1,
                path: "only.bin".to_string(),
                length: 7,
                ..RawFileInfo::default()
            }],
        };
        let meta = convert_torrent(raw);
        assert_eq!(meta.info_hash, "0000");
        assert_eq!(meta.mode, None);
        assert_eq!(meta.files.len(), 1);
    }

    #[test]
    fn download_conversion_clamps_negative_counters() {
        let raw = RawDownloadInfo {
            status: 0,
            total_length: 100,
            bytes_completed: -1,
            download_speed: -5,
            connections: 3,
            name: "ubuntu".to_string(),
            ..RawDownloadInfo::default()
        };
        let info = convert_download(raw).expect("known status");
        assert_eq!(info.status, DownloadStatus::Active);
        assert_eq!(info.bytes_completed, 0);
        assert_eq!(info.download_speed, 0);
        assert_eq!(info.connections, 3);
        assert_eq!(info.name.as_deref(), Some("ubuntu"));
    }

    #[test]
    fn unknown_status_code_is_an_error() {
        let raw = RawDownloadInfo {
            status: 17,
            ..RawDownloadInfo::default()
        };
        assert_eq!(
            convert_download(raw),
            Err(ControllerError::UnknownStatus { code: 17 })
        );
    }
}
