#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Engine-agnostic download session model.
//!
//! Layout: `gid.rs` (session identifiers and their hex codec), `options.rs`
//! (option sets and the wire codec), `model.rs` (snapshots and torrent
//! metadata), `sink.rs` (lifecycle notification sinks), `error.rs` (error
//! taxonomy shared by every controller operation).

pub mod error;
pub mod gid;
pub mod model;
pub mod options;
pub mod sink;

pub use error::{ControllerError, ControllerResult, OptionScope};
pub use gid::{Gid, IntoGid};
pub use model::{DownloadInfo, DownloadStatus, FileRecord, TorrentMetadata, TorrentMode};
pub use options::{GLOBAL_SCOPE_INVALID_KEYS, OptionSet};
pub use sink::{BusSink, NotificationSink, NullSink, deliver};
pub use tether_events::LifecycleEvent;
