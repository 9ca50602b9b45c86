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

//! Configuration for the session controller.
//!
//! Layout: `model.rs` (typed configuration), `loader.rs` (file and environment
//! loading plus validation), `defaults.rs` (default values and variable names).

mod defaults;
pub mod error;
mod loader;
pub mod model;

pub use error::{ConfigError, ConfigResult};
pub use model::ControllerConfig;
