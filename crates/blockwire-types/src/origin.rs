//! Mutation origin and kind tags.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};

/// Where a mutation came from.
///
/// Used to prevent echo loops in bidirectional sync:
/// - Local mutations are always reported to the replication system
/// - Remote mutations (received from it) go through the echo gate first
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumString, IntoStaticStr)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
pub enum Origin {
    /// Produced by user interaction in this editor.
    #[default]
    Local,
    /// Received from the replication system.
    Remote,
}

impl Origin {
    /// Parse from string (case-insensitive).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which structural change a mutation performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, IntoStaticStr)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
pub enum MutationKind {
    Insert,
    Replace,
    Update,
    Remove,
    Swap,
}

impl MutationKind {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

impl std::fmt::Display for MutationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_parse_case_insensitive() {
        assert_eq!(Origin::from_str("REMOTE"), Some(Origin::Remote));
        assert_eq!(Origin::from_str("local"), Some(Origin::Local));
        assert_eq!(Origin::from_str("peer"), None);
    }

    #[test]
    fn test_origin_defaults_to_local() {
        assert_eq!(Origin::default(), Origin::Local);
    }

    #[test]
    fn test_kind_display_matches_serde() {
        for kind in [
            MutationKind::Insert,
            MutationKind::Replace,
            MutationKind::Update,
            MutationKind::Remove,
            MutationKind::Swap,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind));
        }
    }
}
