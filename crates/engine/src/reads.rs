//! Response shapes for the read path (spec §4.4: "read-entries active-version
//! resolution" — `{active-version-id, version-id, data}`).

use vkv_core::types::VersionId;
use std::collections::BTreeMap;

/// Result of `get-entry`, scoped to whichever version was actually read.
#[derive(Debug, Clone)]
pub struct EntryRead {
    /// The dataset's active version at read time, or `None` if never published.
    pub active_version_id: Option<VersionId>,
    /// The version the entry was actually read from.
    pub version_id: VersionId,
    /// The entry's value, or `None` if absent.
    pub data: Option<Vec<u8>>,
}

/// Result of `get-entries`, scoped to whichever version was actually read.
#[derive(Debug, Clone)]
pub struct EntriesRead {
    /// The dataset's active version at read time, or `None` if never published.
    pub active_version_id: Option<VersionId>,
    /// The version the entries were actually read from.
    pub version_id: VersionId,
    /// Entry values keyed by entry key.
    pub data: BTreeMap<String, Vec<u8>>,
}
