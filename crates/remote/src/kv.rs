//! `KvStore` backed by the remote document store. Values are opaque bytes;
//! since the document wire format is JSON, they are base64-encoded on the
//! way in and decoded on the way out.

use crate::client::RemoteDocStoreClient;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use vkv_core::types::VersionId;
use vkv_core::{Error, KvStore, Result};

const ENTRIES: &str = "entries";

#[derive(Serialize, Deserialize)]
struct EntryDoc {
    value_b64: String,
}

fn entry_id(dataset: &str, version: VersionId, table: &str, key: &str) -> String {
    format!("{dataset}|{version}|{table}|{key}")
}

/// A `KvStore` whose entries live in a remote document store.
pub struct RemoteKvStore {
    client: RemoteDocStoreClient,
}

impl RemoteKvStore {
    /// Wrap an already-configured client.
    pub fn new(client: RemoteDocStoreClient) -> Self {
        RemoteKvStore { client }
    }
}

impl KvStore for RemoteKvStore {
    fn put_entry(
        &self,
        dataset: &str,
        version: VersionId,
        table: &str,
        key: &str,
        value: Vec<u8>,
    ) -> Result<()> {
        let doc = EntryDoc {
            value_b64: base64::engine::general_purpose::STANDARD.encode(value),
        };
        let id = entry_id(dataset, version, table, key);
        let json = serde_json::to_value(&doc)
            .map_err(|e| Error::internal(format!("serialize failed: {e}")))?;
        // Entries are plain upserts (spec §4.2: "last write wins"); no CAS.
        self.client.put(ENTRIES, &id, &json)
    }

    fn get_entry(
        &self,
        dataset: &str,
        version: VersionId,
        table: &str,
        key: &str,
    ) -> Result<Option<Vec<u8>>> {
        let id = entry_id(dataset, version, table, key);
        match self.client.get(ENTRIES, &id)? {
            Some(doc) => {
                let doc: EntryDoc = serde_json::from_value(doc)
                    .map_err(|e| Error::internal(format!("deserialize failed: {e}")))?;
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(doc.value_b64)
                    .map_err(|e| Error::internal(format!("malformed base64 entry: {e}")))?;
                Ok(Some(bytes))
            }
            None => Ok(None),
        }
    }

    fn get_entries(
        &self,
        dataset: &str,
        version: VersionId,
        table: &str,
    ) -> Result<BTreeMap<String, Vec<u8>>> {
        let prefix = format!("{dataset}|{version}|{table}|");
        let rows = self.client.query_prefix(ENTRIES, &prefix)?;
        let mut out = BTreeMap::new();
        for (id, doc) in rows {
            let doc: EntryDoc = serde_json::from_value(doc)
                .map_err(|e| Error::internal(format!("deserialize failed: {e}")))?;
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(&doc.value_b64)
                .map_err(|e| Error::internal(format!("malformed base64 entry: {e}")))?;
            let key = id
                .rsplit('|')
                .next()
                .map(str::to_string)
                .unwrap_or(id);
            out.insert(key, bytes);
        }
        Ok(out)
    }

    fn delete_version_entries(&self, dataset: &str, version: VersionId) -> Result<()> {
        let prefix = format!("{dataset}|{version}|");
        self.client.delete_prefix(ENTRIES, &prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_id_is_pipe_delimited_in_field_order() {
        let version = VersionId::new();
        let id = entry_id("recs", version, "items", "k1");
        assert_eq!(id, format!("recs|{version}|items|k1"));
    }

    #[test]
    fn entry_id_trailing_segment_recovers_the_original_key() {
        let version = VersionId::new();
        let id = entry_id("recs", version, "items", "k1");
        assert_eq!(id.rsplit('|').next(), Some("k1"));
    }
}
