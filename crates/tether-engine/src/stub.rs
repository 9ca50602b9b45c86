//! In-memory engine double.
//!
//! Behaves like the external engine closely enough to drive the controller in
//! tests and demos: sequential identifiers, scheme checks on URIs, magnet
//! metadata that arrives after a configurable number of snapshot reads, and
//! lifecycle events raised from whichever thread runs [`NativeEngine::start`].

use std::collections::HashMap;
use std::path::Path;

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;
use tether_core::options::{self, OptionSet};
use tether_core::{DownloadStatus, Gid};
use tracing::debug;

use crate::bridge::{
    EVENT_BT_COMPLETE, EVENT_COMPLETE, EVENT_ERROR, EVENT_PAUSE, EVENT_START, EVENT_STOP,
    notify_event,
};
use crate::native::{NativeEngine, RawDownloadInfo, RawFileInfo, RawTorrentInfo};
use crate::registry::ControllerHandle;

/// Bytes reported for a URI download.
pub const URI_PAYLOAD_LENGTH: i64 = 4 * 1_024;
/// Bytes reported for a magnet download once its metadata has arrived.
pub const MAGNET_PAYLOAD_LENGTH: i64 = 1_024 * 1_024;
/// Download directory every stub session reports.
pub const STUB_DOWNLOAD_DIR: &str = "/downloads";

const URI_SCHEMES: [&str; 4] = ["http", "https", "ftp", "sftp"];
const MAGNET_PREFIX: &str = "magnet:?";
const MAGNET_TOPIC: &str = "xt=urn:btih:";
const PIECE_LENGTH: i64 = 16 * 1_024;

enum Signal {
    Event { id: u64, code: i32 },
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Uri,
    Magnet,
    Torrent,
}

struct StubDownload {
    kind: Kind,
    status: DownloadStatus,
    options: OptionSet,
    name: String,
    total_length: i64,
    bytes_completed: i64,
    files: Vec<RawFileInfo>,
    metadata_after: u32,
    reads: u32,
}

impl StubDownload {
    fn known_length(&self) -> i64 {
        if self.reads > self.metadata_after {
            self.total_length
        } else {
            0
        }
    }
}

#[derive(Default)]
struct StubState {
    next_id: u64,
    downloads: HashMap<u64, StubDownload>,
    torrents: HashMap<String, RawTorrentInfo>,
    global_options: OptionSet,
    handle: Option<ControllerHandle>,
    init_options: Option<String>,
    init_code: i32,
    deinit_calls: u32,
    metadata_latency: u32,
}

/// Scriptable stand-in for the external download engine.
pub struct StubEngine {
    state: Mutex<StubState>,
    signals: Sender<Signal>,
    inbox: Receiver<Signal>,
}

impl Default for StubEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StubEngine {
    /// Empty engine with no registered torrents and immediate metadata.
    #[must_use]
    pub fn new() -> Self {
        let (signals, inbox) = unbounded();
        Self {
            state: Mutex::new(StubState {
                next_id: 1,
                ..StubState::default()
            }),
            signals,
            inbox,
        }
    }

    /// Make later magnet sessions report a zero total length for the first
    /// `reads` snapshot reads.
    pub fn set_metadata_latency(&self, reads: u32) {
        self.state.lock().metadata_latency = reads;
    }

    /// Make [`NativeEngine::init`] return `code`.
    pub fn fail_init(&self, code: i32) {
        self.state.lock().init_code = code;
    }

    /// Declare the parse result for a torrent file at `path`.
    ///
    /// Files without a registration fail to parse, as do registered paths that
    /// no longer exist on disk.
    pub fn register_torrent(&self, path: &Path, info: RawTorrentInfo) {
        self.state
            .lock()
            .torrents
            .insert(path.display().to_string(), info);
    }

    /// Mark a session complete and raise the matching event.
    #[must_use]
    pub fn complete(&self, gid: Gid) -> bool {
        let code = {
            let mut state = self.state.lock();
            let Some(download) = state.downloads.get_mut(&gid.as_raw()) else {
                return false;
            };
            download.status = DownloadStatus::Complete;
            download.reads = download.reads.max(download.metadata_after.saturating_add(1));
            download.bytes_completed = download.total_length;
            for file in &mut download.files {
                file.completed_length = file.length;
            }
            if download.kind == Kind::Uri {
                EVENT_COMPLETE
            } else {
                EVENT_BT_COMPLETE
            }
        };
        self.raise_event(gid, code);
        true
    }

    /// Mark a session failed and raise the error event.
    #[must_use]
    pub fn fail(&self, gid: Gid) -> bool {
        if !self.force_status(gid, DownloadStatus::Error) {
            return false;
        }
        self.raise_event(gid, EVENT_ERROR);
        true
    }

    /// Set a session's status without raising an event.
    #[must_use]
    pub fn force_status(&self, gid: Gid, status: DownloadStatus) -> bool {
        let mut state = self.state.lock();
        let Some(download) = state.downloads.get_mut(&gid.as_raw()) else {
            return false;
        };
        download.status = status;
        true
    }

    /// Queue a raw event code for delivery from the engine loop.
    pub fn raise_event(&self, gid: Gid, code: i32) {
        let _ = self.signals.send(Signal::Event {
            id: gid.as_raw(),
            code,
        });
    }

    /// Number of snapshot reads served for `gid`.
    #[must_use]
    pub fn info_reads(&self, gid: Gid) -> u32 {
        self.state
            .lock()
            .downloads
            .get(&gid.as_raw())
            .map_or(0, |download| download.reads)
    }

    /// Handle received at initialisation.
    #[must_use]
    pub fn handle(&self) -> Option<ControllerHandle> {
        self.state.lock().handle
    }

    /// Global option wire string received at initialisation.
    #[must_use]
    pub fn init_options(&self) -> Option<String> {
        self.state.lock().init_options.clone()
    }

    /// Number of times the session was finalised.
    #[must_use]
    pub fn deinit_calls(&self) -> u32 {
        self.state.lock().deinit_calls
    }

    fn register(&self, download: StubDownload) -> u64 {
        let id = {
            let mut state = self.state.lock();
            let id = state.next_id;
            state.next_id += 1;
            state.downloads.insert(id, download);
            id
        };
        let _ = self.signals.send(Signal::Event {
            id,
            code: EVENT_START,
        });
        id
    }

    fn transition(
        &self,
        id: u64,
        from: &[DownloadStatus],
        to: DownloadStatus,
        code: Option<i32>,
    ) -> bool {
        {
            let mut state = self.state.lock();
            let Some(download) = state.downloads.get_mut(&id) else {
                return false;
            };
            if !from.contains(&download.status) {
                return false;
            }
            download.status = to;
        }
        if let Some(code) = code {
            let _ = self.signals.send(Signal::Event { id, code });
        }
        true
    }
}

impl NativeEngine for StubEngine {
    fn init(&self, handle: ControllerHandle, global_options: &str) -> i32 {
        let mut state = self.state.lock();
        if state.init_code != 0 {
            return state.init_code;
        }
        if let Ok(parsed) = options::decode(global_options) {
            state.global_options = parsed;
        }
        state.handle = Some(handle);
        state.init_options = Some(global_options.to_string());
        0
    }

    fn start(&self) {
        while let Ok(signal) = self.inbox.recv() {
            match signal {
                Signal::Event { id, code } => {
                    let handle = self.state.lock().handle;
                    match handle {
                        Some(handle) => notify_event(handle, id, code),
                        None => debug!(id, code, "stub engine raised event before init"),
                    }
                }
                Signal::Shutdown => break,
            }
        }
    }

    fn deinit(&self) -> i32 {
        self.state.lock().deinit_calls += 1;
        let _ = self.signals.send(Signal::Shutdown);
        0
    }

    fn add_uri(&self, uri: &str, options: &str) -> u64 {
        let Ok(options) = options::decode(options) else {
            return 0;
        };
        let latency = self.state.lock().metadata_latency;
        let download = if let Some(query) = uri.strip_prefix(MAGNET_PREFIX) {
            if !query.split('&').any(|param| param.starts_with(MAGNET_TOPIC)) {
                return 0;
            }
            let name = query
                .split('&')
                .find_map(|param| param.strip_prefix("dn="))
                .unwrap_or("magnet-payload")
                .to_string();
            StubDownload {
                kind: Kind::Magnet,
                status: DownloadStatus::Active,
                options,
                files: vec![stub_file(1, &name, MAGNET_PAYLOAD_LENGTH)],
                name,
                total_length: MAGNET_PAYLOAD_LENGTH,
                bytes_completed: 0,
                metadata_after: latency,
                reads: 0,
            }
        } else {
            let Some((scheme, rest)) = uri.split_once("://") else {
                return 0;
            };
            if !URI_SCHEMES.contains(&scheme) || rest.is_empty() {
                return 0;
            }
            let file_name = rest.rsplit('/').next().filter(|segment| !segment.is_empty());
            StubDownload {
                kind: Kind::Uri,
                status: DownloadStatus::Active,
                options,
                name: String::new(),
                total_length: URI_PAYLOAD_LENGTH,
                bytes_completed: 0,
                files: vec![stub_file(1, file_name.unwrap_or("index.html"), URI_PAYLOAD_LENGTH)],
                metadata_after: 0,
                reads: 0,
            }
        };
        self.register(download)
    }

    fn parse_torrent(&self, path: &str) -> Option<RawTorrentInfo> {
        if !Path::new(path).is_file() {
            return None;
        }
        self.state.lock().torrents.get(path).cloned()
    }

    fn add_torrent(&self, path: &str, options: &str) -> u64 {
        let Ok(options) = options::decode(options) else {
            return 0;
        };
        let Some(info) = self.parse_torrent(path) else {
            return 0;
        };
        let name = info.meta.as_ref().map(|meta| meta.name.clone()).unwrap_or_default();
        let total_length = info.files.iter().map(|file| file.length).sum();
        self.register(StubDownload {
            kind: Kind::Torrent,
            status: DownloadStatus::Active,
            options,
            name,
            total_length,
            bytes_completed: 0,
            files: info.files,
            metadata_after: 0,
            reads: 0,
        })
    }

    fn change_options(&self, id: u64, options: &str) -> bool {
        let Ok(changes) = options::decode(options) else {
            return false;
        };
        let mut state = self.state.lock();
        let Some(download) = state.downloads.get_mut(&id) else {
            return false;
        };
        if download.status.is_terminal() {
            return false;
        }
        for (key, value) in &changes {
            download.options.insert(key.clone(), value.clone());
        }
        true
    }

    fn get_options(&self, id: u64) -> Option<String> {
        let state = self.state.lock();
        let download = state.downloads.get(&id)?;
        options::encode(&download.options).ok().map(with_trailing_separator)
    }

    fn change_global_options(&self, options: &str) -> bool {
        let Ok(changes) = options::decode(options) else {
            return false;
        };
        if !changes.global_scope_invalid_keys().is_empty() {
            return false;
        }
        let mut state = self.state.lock();
        for (key, value) in &changes {
            state.global_options.insert(key.clone(), value.clone());
        }
        true
    }

    fn get_global_options(&self) -> String {
        let state = self.state.lock();
        options::encode(&state.global_options)
            .map(with_trailing_separator)
            .unwrap_or_default()
    }

    fn pause(&self, id: u64) -> bool {
        self.transition(
            id,
            &[DownloadStatus::Active, DownloadStatus::Waiting],
            DownloadStatus::Paused,
            Some(EVENT_PAUSE),
        )
    }

    fn resume(&self, id: u64) -> bool {
        self.transition(id, &[DownloadStatus::Paused], DownloadStatus::Waiting, None)
    }

    fn remove_download(&self, id: u64) -> bool {
        self.transition(
            id,
            &[
                DownloadStatus::Active,
                DownloadStatus::Waiting,
                DownloadStatus::Paused,
                DownloadStatus::Complete,
                DownloadStatus::Error,
            ],
            DownloadStatus::Removed,
            Some(EVENT_STOP),
        )
    }

    fn get_download_info(&self, id: u64) -> Option<RawDownloadInfo> {
        let mut state = self.state.lock();
        let download = state.downloads.get_mut(&id)?;
        download.reads = download.reads.saturating_add(1);
        let total_length = download.known_length();
        let num_pieces = if total_length == 0 {
            0
        } else {
            i32::try_from((total_length + PIECE_LENGTH - 1) / PIECE_LENGTH).unwrap_or(i32::MAX)
        };
        let bt = download.kind != Kind::Uri;
        Some(RawDownloadInfo {
            status: download.status.code(),
            total_length,
            bytes_completed: download.bytes_completed,
            upload_length: 0,
            download_speed: 0,
            upload_speed: 0,
            piece_length: if total_length == 0 { 0 } else { PIECE_LENGTH },
            num_pieces,
            connections: i32::from(download.status == DownloadStatus::Active),
            bit_field: String::new(),
            dir: STUB_DOWNLOAD_DIR.to_string(),
            name: if bt && total_length > 0 {
                download.name.clone()
            } else {
                String::new()
            },
            files: if bt && total_length == 0 {
                Vec::new()
            } else {
                download.files.clone()
            },
        })
    }
}

fn stub_file(index: i32, name: &str, length: i64) -> RawFileInfo {
    RawFileInfo {
        index,
        path: format!("{STUB_DOWNLOAD_DIR}/{name}"),
        length,
        completed_length: 0,
        selected: true,
    }
}

fn with_trailing_separator(mut wire: String) -> String {
    if !wire.is_empty() {
        wire.push(options::SEPARATOR);
    }
    wire
}
