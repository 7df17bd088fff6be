//! Block identifiers.
//!
//! A [`BlockId`] wraps a UUIDv7 assigned by whichever client created the
//! block. It is stable across moves, data edits and tool replacement, which is
//! what lets a replication system address the same block on every peer.
//! The `short()` form (first 8 hex chars) is for logs only, never for lookup.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A block identifier (UUIDv7).
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(uuid::Uuid);

impl BlockId {
    /// Create a new time-ordered ID (UUIDv7).
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }

    /// First 8 hex characters, for human display only, not lookup.
    pub fn short(&self) -> String {
        self.0.as_simple().to_string()[..8].to_string()
    }

    /// Parse from a hex string (32 chars, no hyphens) or standard UUID format.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        uuid::Uuid::parse_str(s).map(Self)
    }

    /// A nil / zero ID, for sentinel values only.
    pub fn nil() -> Self {
        Self(uuid::Uuid::nil())
    }

    /// Check if this is the nil ID.
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for BlockId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::str::FromStr for BlockId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Full UUID with hyphens, same text the replication side sees
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId({})", self.short())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_ids_are_unique() {
        let a = BlockId::new();
        let b = BlockId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_display_is_full_uuid_with_hyphens() {
        let id = BlockId::new();
        let displayed = id.to_string();
        assert_eq!(displayed.len(), 36);
        assert_eq!(displayed.chars().filter(|c| *c == '-').count(), 4);
    }

    #[test]
    fn test_debug_shows_type_and_short() {
        let id = BlockId::new();
        let debug = format!("{:?}", id);
        assert!(debug.starts_with("BlockId("));
        let inner = &debug["BlockId(".len()..debug.len() - 1];
        assert_eq!(inner.len(), 8);
    }

    #[test]
    fn test_parse_accepts_display_and_hex_forms() {
        let id = BlockId::new();
        assert_eq!(BlockId::parse(&id.to_string()).unwrap(), id);
        assert_eq!(BlockId::parse(&id.0.as_simple().to_string()).unwrap(), id);
        assert!(BlockId::parse("not-a-uuid").is_err());
    }

    #[test]
    fn test_serde_is_transparent() {
        let id = BlockId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
        let back: BlockId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_nil_sentinel() {
        assert!(BlockId::nil().is_nil());
        assert!(!BlockId::new().is_nil());
    }
}
