//! Primitive identifiers and name validation shared across the contract types.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A "web-safe" name: non-empty, ASCII alphanumeric plus `-` and `_`.
///
/// Used for dataset names, table names, and entry keys. Rejecting anything
/// else keeps these names safe to embed directly in URL path segments.
pub fn is_web_safe(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
}

/// Opaque identifier for a [`crate::contract::Version`].
///
/// Generated by the orchestrator on `create-version`; never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionId(pub Uuid);

impl VersionId {
    /// Mint a fresh, random version id.
    pub fn new() -> Self {
        VersionId(Uuid::new_v4())
    }
}

impl Default for VersionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for VersionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(VersionId(Uuid::parse_str(s)?))
    }
}

/// Opaque identifier for a [`crate::contract::QueueMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub Uuid);

impl MessageId {
    /// Mint a fresh, random message id.
    pub fn new() -> Self {
        MessageId(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn web_safe_rejects_empty_and_slashes() {
        assert!(is_web_safe("items"));
        assert!(is_web_safe("items-v2_final.1"));
        assert!(!is_web_safe(""));
        assert!(!is_web_safe("a/b"));
        assert!(!is_web_safe(" spaced"));
    }

    #[test]
    fn version_id_round_trips_through_display_and_parse() {
        let id = VersionId::new();
        let text = id.to_string();
        let parsed: VersionId = text.parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn fresh_ids_are_distinct() {
        assert_ne!(VersionId::new(), VersionId::new());
        assert_ne!(MessageId::new(), MessageId::new());
    }
}
