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

//! Session controller bridging applications to an external download engine.

/// Routing of engine callbacks to notification sinks.
pub mod bridge;
/// Application-facing session controller.
pub mod controller;
/// Typed wrapper translating engine sentinels into results.
pub mod gateway;
/// Raw engine boundary.
pub mod native;
/// Metadata polling with a bounded retry budget.
pub mod poller;
/// Generation-checked controller handles.
pub mod registry;
/// In-memory engine double.
pub mod stub;

pub use bridge::{EventBridge, notify_event, translate_event_code};
pub use controller::{ENGINE_THREAD_NAME, SessionController};
pub use gateway::EngineGateway;
pub use native::{NativeEngine, RawDownloadInfo, RawFileInfo, RawMetaInfo, RawTorrentInfo};
pub use poller::{PollPolicy, ProgressPoller};
pub use registry::ControllerHandle;
pub use stub::StubEngine;
