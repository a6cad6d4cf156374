//! Block keys.
//!
//! A [`BlockKey`] wraps a UUIDv7 (time-ordered, globally unique). Keys live
//! for one editing session only: they are never written to saved documents
//! and are regenerated whenever a document is loaded. The `short()` form is
//! for logs and human-facing UI, never for lookup.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identity of a block within a document session.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockKey(uuid::Uuid);

impl BlockKey {
    /// Create a fresh key.
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }

    /// First 8 hex characters, for display only.
    pub fn short(&self) -> String {
        self.0.as_simple().to_string()[..8].to_string()
    }

    /// Full 32-character hex string (no hyphens).
    pub fn to_hex(&self) -> String {
        self.0.as_simple().to_string()
    }

    /// Parse from a hex string (32 chars, no hyphens) or standard UUID format.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        uuid::Uuid::parse_str(s).map(Self)
    }

    /// Check if a query string matches this key by hex prefix.
    pub fn matches_hex_prefix(&self, prefix: &str) -> bool {
        self.to_hex().starts_with(prefix)
    }
}

impl Default for BlockKey {
    fn default() -> Self {
        Self::new()
    }
}

impl From<uuid::Uuid> for BlockKey {
    fn from(u: uuid::Uuid) -> Self {
        Self(u)
    }
}

impl fmt::Display for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockKey({})", self.short())
    }
}
