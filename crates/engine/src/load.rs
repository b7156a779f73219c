//! Normalizes the three `load-entries` call shapes (spec §4.4) into the
//! single `Vec<LoadRow>` shape the orchestrator validates and writes.

use vkv_core::contract::LoadRow;
use vkv_core::types::VersionId;

/// The three accepted shapes of a `load-entries` call.
pub enum LoadEntriesRequest {
    /// `(version-id, dataset, [{table, key, value}…])`.
    Rows {
        /// Target version.
        version_id: VersionId,
        /// Target dataset.
        dataset: String,
        /// Rows to write.
        rows: Vec<LoadRow>,
    },
    /// `(version-id, dataset, table, [{key, value}…])`.
    Table {
        /// Target version.
        version_id: VersionId,
        /// Target dataset.
        dataset: String,
        /// Table all rows belong to.
        table: String,
        /// `(key, value)` pairs.
        entries: Vec<(String, Vec<u8>)>,
    },
    /// `(version-id, dataset, table, key, value)`.
    Single {
        /// Target version.
        version_id: VersionId,
        /// Target dataset.
        dataset: String,
        /// Target table.
        table: String,
        /// Target key.
        key: String,
        /// Value to write.
        value: Vec<u8>,
    },
}

impl LoadEntriesRequest {
    /// The `version-id` common to every shape.
    pub fn version_id(&self) -> VersionId {
        match self {
            LoadEntriesRequest::Rows { version_id, .. }
            | LoadEntriesRequest::Table { version_id, .. }
            | LoadEntriesRequest::Single { version_id, .. } => *version_id,
        }
    }

    /// The `dataset` common to every shape.
    pub fn dataset(&self) -> &str {
        match self {
            LoadEntriesRequest::Rows { dataset, .. }
            | LoadEntriesRequest::Table { dataset, .. }
            | LoadEntriesRequest::Single { dataset, .. } => dataset,
        }
    }

    /// Normalize to the first shape: a flat list of `{table, key, value}`.
    pub fn into_rows(self) -> Vec<LoadRow> {
        match self {
            LoadEntriesRequest::Rows { rows, .. } => rows,
            LoadEntriesRequest::Table { table, entries, .. } => entries
                .into_iter()
                .map(|(key, value)| LoadRow {
                    table: table.clone(),
                    key,
                    value,
                })
                .collect(),
            LoadEntriesRequest::Single {
                table, key, value, ..
            } => vec![LoadRow { table, key, value }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_shape_normalizes_to_one_row_per_entry() {
        let request = LoadEntriesRequest::Table {
            version_id: VersionId::new(),
            dataset: "recs".to_string(),
            table: "items".to_string(),
            entries: vec![
                ("k1".to_string(), b"v1".to_vec()),
                ("k2".to_string(), b"v2".to_vec()),
            ],
        };
        let rows = request.into_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].table, "items");
    }

    #[test]
    fn single_shape_normalizes_to_one_row() {
        let request = LoadEntriesRequest::Single {
            version_id: VersionId::new(),
            dataset: "recs".to_string(),
            table: "items".to_string(),
            key: "k1".to_string(),
            value: b"v1".to_vec(),
        };
        let rows = request.into_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key, "k1");
    }
}
