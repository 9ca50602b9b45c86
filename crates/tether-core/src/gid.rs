//! Session identifiers and their hexadecimal presentation.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::error::{ControllerError, ControllerResult};

/// Engine-assigned identifier of a registered download.
///
/// Externally the identifier is the shortest lowercase hex form of the integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Gid(u64);

impl Gid {
    /// Wrap a raw engine identifier.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw identifier handed back to the engine.
    #[must_use]
    pub const fn as_raw(self) -> u64 {
        self.0
    }

    /// Parse the hex form of an identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::InvalidFormat`] when the input is empty,
    /// contains a non-hex character, or overflows 64 bits.
    pub fn parse(hex: &str) -> ControllerResult<Self> {
        decode(hex).map(Self)
    }
}

impl Display for Gid {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{:x}", self.0)
    }
}

impl FromStr for Gid {
    type Err = ControllerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl From<Gid> for u64 {
    fn from(gid: Gid) -> Self {
        gid.0
    }
}

/// Arguments accepted wherever a session identifier is expected.
///
/// Hex strings are parsed on conversion, so a malformed one surfaces as
/// [`ControllerError::InvalidFormat`] before any engine command is issued.
pub trait IntoGid {
    /// Resolve the argument into a [`Gid`].
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::InvalidFormat`] for malformed hex input.
    fn into_gid(self) -> ControllerResult<Gid>;
}

impl IntoGid for Gid {
    fn into_gid(self) -> ControllerResult<Gid> {
        Ok(self)
    }
}

impl IntoGid for &Gid {
    fn into_gid(self) -> ControllerResult<Gid> {
        Ok(*self)
    }
}

impl IntoGid for &str {
    fn into_gid(self) -> ControllerResult<Gid> {
        Gid::parse(self)
    }
}

impl IntoGid for &String {
    fn into_gid(self) -> ControllerResult<Gid> {
        Gid::parse(self)
    }
}

impl IntoGid for String {
    fn into_gid(self) -> ControllerResult<Gid> {
        Gid::parse(&self)
    }
}

/// Render a raw identifier as lowercase hex without padding.
#[must_use]
pub fn encode(id: u64) -> String {
    format!("{id:x}")
}

/// Parse a hex identifier, accepting either case.
///
/// # Errors
///
/// Returns [`ControllerError::InvalidFormat`] for anything other than one or
/// more hex digits that fit in 64 bits. A failed parse never yields zero.
pub fn decode(hex: &str) -> ControllerResult<u64> {
    // `from_str_radix` tolerates a leading sign, which is not a hex digit.
    if hex.is_empty() || !hex.bytes().all(|byte| byte.is_ascii_hexdigit()) {
        return Err(invalid(hex));
    }
    u64::from_str_radix(hex, 16).map_err(|_| invalid(hex))
}

fn invalid(hex: &str) -> ControllerError {
    ControllerError::InvalidFormat {
        value: hex.to_string(),
    }
}
