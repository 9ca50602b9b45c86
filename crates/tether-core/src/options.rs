//! Option sets and the flattened wire encoding understood by the engine.
//!
//! The wire form alternates key and value tokens joined by [`SEPARATOR`]:
//! `dir;/tmp;max-connection-per-server;4`. The engine terminates its own output
//! with a trailing separator, which decoding tolerates.

use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::{Deserialize, Serialize};

use crate::error::{ControllerError, ControllerResult};

/// Token separator of the option wire format.
pub const SEPARATOR: char = ';';

/// Keys the engine documents as invalid at global scope.
///
/// They are forwarded untouched; the engine is the one that rejects them.
pub const GLOBAL_SCOPE_INVALID_KEYS: [&str; 5] =
    ["checksum", "index-out", "out", "pause", "select-file"];

/// Unordered mapping from option name to value, keys unique.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionSet(BTreeMap<String, String>);

impl OptionSet {
    /// An empty option set.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace an option, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    /// Look up an option value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Whether the set contains `key`.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of options in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set holds no options.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over options in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
        self.0.iter()
    }

    /// Keys from [`GLOBAL_SCOPE_INVALID_KEYS`] present in this set.
    #[must_use]
    pub fn global_scope_invalid_keys(&self) -> Vec<&'static str> {
        GLOBAL_SCOPE_INVALID_KEYS
            .into_iter()
            .filter(|key| self.contains_key(key))
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for OptionSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

impl<'a> IntoIterator for &'a OptionSet {
    type Item = (&'a String, &'a String);
    type IntoIter = btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Flatten an option set into the engine wire format.
///
/// An empty set encodes to the empty string.
///
/// # Errors
///
/// Returns [`ControllerError::MalformedOptions`] when a key or value contains
/// the separator, since the result could not be decoded back losslessly.
pub fn encode(options: &OptionSet) -> ControllerResult<String> {
    let mut wire = String::new();
    for (key, value) in options {
        if key.contains(SEPARATOR) || value.contains(SEPARATOR) {
            return Err(ControllerError::MalformedOptions {
                reason: "option token contains the separator",
            });
        }
        if !wire.is_empty() {
            wire.push(SEPARATOR);
        }
        wire.push_str(key);
        wire.push(SEPARATOR);
        wire.push_str(value);
    }
    Ok(wire)
}

/// Encode an optional option set; `None` behaves like an empty set.
///
/// # Errors
///
/// See [`encode`].
pub fn encode_opt(options: Option<&OptionSet>) -> ControllerResult<String> {
    options.map_or_else(|| Ok(String::new()), encode)
}

/// Parse the engine wire format back into an option set.
///
/// The empty string decodes to an empty set. A single trailing separator is
/// trimmed when it leaves an odd token count, which is how the engine
/// terminates its output. Later duplicates of a key replace earlier ones.
///
/// # Errors
///
/// Returns [`ControllerError::MalformedOptions`] when the tokens do not pair up
/// or a key is empty.
pub fn decode(wire: &str) -> ControllerResult<OptionSet> {
    if wire.is_empty() {
        return Ok(OptionSet::new());
    }

    let mut tokens: Vec<&str> = wire.split(SEPARATOR).collect();
    if tokens.len() % 2 == 1 && tokens.last().is_some_and(|token| token.is_empty()) {
        tokens.pop();
    }
    if tokens.len() % 2 == 1 {
        return Err(ControllerError::MalformedOptions {
            reason: "odd number of option tokens",
        });
    }

    if tokens.chunks_exact(2).any(|pair| pair[0].is_empty()) {
        return Err(ControllerError::MalformedOptions {
            reason: "empty option key",
        });
    }

    Ok(tokens
        .chunks_exact(2)
        .map(|pair| (pair[0], pair[1]))
        .collect())
}
