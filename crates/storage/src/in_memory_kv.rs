//! The in-memory `KvStore` backend.

use dashmap::DashMap;
use std::collections::BTreeMap;
use vkv_core::types::VersionId;
use vkv_core::{KvStore, Result};

type EntryKey = (String, VersionId, String, String);

/// An in-process `KvStore`, keyed by `(dataset, version, table, key)`.
#[derive(Default)]
pub struct InMemoryKvStore {
    entries: DashMap<EntryKey, Vec<u8>>,
}

impl InMemoryKvStore {
    /// An empty store.
    pub fn new() -> Self {
        InMemoryKvStore::default()
    }
}

impl KvStore for InMemoryKvStore {
    fn put_entry(
        &self,
        dataset: &str,
        version: VersionId,
        table: &str,
        key: &str,
        value: Vec<u8>,
    ) -> Result<()> {
        self.entries.insert(
            (dataset.to_string(), version, table.to_string(), key.to_string()),
            value,
        );
        Ok(())
    }

    fn get_entry(
        &self,
        dataset: &str,
        version: VersionId,
        table: &str,
        key: &str,
    ) -> Result<Option<Vec<u8>>> {
        Ok(self
            .entries
            .get(&(dataset.to_string(), version, table.to_string(), key.to_string()))
            .map(|r| r.value().clone()))
    }

    fn get_entries(
        &self,
        dataset: &str,
        version: VersionId,
        table: &str,
    ) -> Result<BTreeMap<String, Vec<u8>>> {
        Ok(self
            .entries
            .iter()
            .filter(|r| {
                let (d, v, t, _) = r.key();
                d == dataset && *v == version && t == table
            })
            .map(|r| (r.key().3.clone(), r.value().clone()))
            .collect())
    }

    fn delete_version_entries(&self, dataset: &str, version: VersionId) -> Result<()> {
        self.entries
            .retain(|(d, v, _, _), _| !(d == dataset && *v == version));
        Ok(())
    }
}
