//! The `Entry` composite key (spec §3): a value at `(dataset, version, table, key)`.

use crate::types::{is_web_safe, VersionId};
use serde::{Deserialize, Serialize};

/// Composite key identifying one entry. The KV store never interprets the
/// value; it is opaque bytes bound to the lifetime of its version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryKey {
    /// Owning dataset name.
    pub dataset: String,
    /// Owning version id.
    pub version: VersionId,
    /// Table name within the dataset.
    pub table: String,
    /// Web-safe, non-empty key.
    pub key: String,
}

impl EntryKey {
    /// Construct a key, validating only the `key` component is web-safe —
    /// `dataset`/`table` are validated at the dataset-creation boundary.
    pub fn new(
        dataset: impl Into<String>,
        version: VersionId,
        table: impl Into<String>,
        key: impl Into<String>,
    ) -> Result<Self, String> {
        let key = key.into();
        if !is_web_safe(&key) {
            return Err(format!("entry key {key:?} is not web-safe"));
        }
        Ok(EntryKey {
            dataset: dataset.into(),
            version,
            table: table.into(),
            key,
        })
    }
}

/// One row of a batch load: `{table, key, value}`, the normalized shape all
/// three `load-entries` call shapes reduce to (spec §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadRow {
    /// Table this row belongs to.
    pub table: String,
    /// Entry key within the table.
    pub key: String,
    /// Opaque value bytes.
    pub value: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_web_safe_key() {
        assert!(EntryKey::new("recs", VersionId::new(), "items", "k/1").is_err());
    }

    #[test]
    fn accepts_web_safe_key() {
        assert!(EntryKey::new("recs", VersionId::new(), "items", "k1").is_ok());
    }
}
