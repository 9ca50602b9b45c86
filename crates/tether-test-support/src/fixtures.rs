//! Download targets and torrent files for integration tests.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tempfile::TempDir;

/// Info hash used by [`MAGNET_URI`].
pub const MAGNET_INFO_HASH: &str = "0123456789abcdef0123456789abcdef01234567";
/// Magnet link with a display name.
pub const MAGNET_URI: &str =
    "magnet:?xt=urn:btih:0123456789abcdef0123456789abcdef01234567&dn=demo";
/// Plain HTTP download target.
pub const HTTP_URI: &str = "http://mirror.example.org/releases/tool-1.0.tar.gz";
/// URI with a scheme no engine accepts.
pub const UNSUPPORTED_URI: &str = "gopher://example.org/file";

/// Minimal single-file torrent in bencode form.
pub const SAMPLE_TORRENT: &[u8] = b"d8:announce30:udp://tracker.example/announce4:infod6:lengthi42e4:name10:sample.bin12:piece lengthi16384e6:pieces20:aaaaaaaaaaaaaaaaaaaaee";

/// Temporary directory holding torrent files; removed on drop.
pub struct TorrentDir {
    dir: TempDir,
}

impl TorrentDir {
    /// Create an empty directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary directory cannot be created.
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("failed to create torrent fixture dir")?;
        Ok(Self { dir })
    }

    /// Write `contents` to `name` inside the directory and return its path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write(&self, name: &str, contents: &[u8]) -> Result<PathBuf> {
        let path = self.dir.path().join(name);
        fs::write(&path, contents)
            .with_context(|| format!("failed to write fixture {}", path.display()))?;
        Ok(path)
    }

    /// Write [`SAMPLE_TORRENT`] under `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn sample(&self, name: &str) -> Result<PathBuf> {
        self.write(name, SAMPLE_TORRENT)
    }

    /// Write bytes that are not a torrent under `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn corrupt(&self, name: &str) -> Result<PathBuf> {
        self.write(name, b"this is not bencode")
    }
}
