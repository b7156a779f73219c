//! The synchronous front door to the store (spec §4.4): validates and
//! commits metadata transitions, stages entries, and hands off durable work
//! to the operations queue for the worker to pick up.
//!
//! Mirrors the shape of a teacher-style coordinator: a thin struct holding
//! `Arc`s to the three backend traits, generic over any implementation.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value as Json;
use tracing::{debug, info};

use vkv_concurrency::TtlCache;
use vkv_core::contract::{Action, CreateDatasetArgs, CreateVersionArgs, Dataset, MessageBody, Version, VersionStatus};
use vkv_core::limits::MAX_BATCH_SIZE;
use vkv_core::types::VersionId;
use vkv_core::{Error, KvStore, MetadataStore, Queue, Result};

use crate::load::LoadEntriesRequest;
use crate::reads::{EntriesRead, EntryRead};

/// The durable-queue topic every lifecycle action is enqueued on.
pub const OPERATIONS_TOPIC: &str = "vkv-operations";

/// Orchestrates dataset/version lifecycle operations and entry reads against
/// whatever concrete `MetadataStore`/`KvStore`/`Queue` the caller wires up.
pub struct Orchestrator {
    metadata: Arc<dyn MetadataStore>,
    kv: Arc<dyn KvStore>,
    queue: Arc<dyn Queue>,
    operations_topic: String,
    dataset_cache: TtlCache<String, Option<Dataset>>,
}

impl Orchestrator {
    /// Wire an orchestrator over already-constructed backends, caching
    /// `get-dataset` lookups on the read path for `cache_ttl`.
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        kv: Arc<dyn KvStore>,
        queue: Arc<dyn Queue>,
        cache_ttl: Duration,
    ) -> Self {
        Orchestrator {
            metadata,
            kv,
            queue,
            operations_topic: OPERATIONS_TOPIC.to_string(),
            dataset_cache: TtlCache::new(cache_ttl),
        }
    }

    /// Create a dataset.
    pub fn create_dataset(&self, args: CreateDatasetArgs) -> Result<Dataset> {
        let dataset = self.metadata.create_dataset(args)?;
        self.dataset_cache.invalidate(&dataset.name);
        info!(dataset = %dataset.name, "dataset created");
        Ok(dataset)
    }

    /// Fetch a dataset by name, bypassing the read-path cache (callers of
    /// this method want the current state, not an eventually-consistent one).
    pub fn get_dataset(&self, name: &str) -> Result<Option<Dataset>> {
        self.metadata.get_dataset(name)
    }

    /// All datasets.
    pub fn list_datasets(&self) -> Result<Vec<Dataset>> {
        self.metadata.list_datasets()
    }

    /// Create a version and enqueue its `prepare` action.
    pub fn create_version(&self, args: CreateVersionArgs) -> Result<Version> {
        let version = self.metadata.create_version(args)?;
        self.queue.send(
            &self.operations_topic,
            MessageBody {
                action: Action::Prepare,
                version_id: version.id,
                reason: None,
            },
        )?;
        debug!(version = %version.id, "version created, prepare enqueued");
        Ok(version)
    }

    /// Fetch a version by id.
    pub fn get_version(&self, id: VersionId) -> Result<Option<Version>> {
        self.metadata.get_version(id)
    }

    /// All versions for one dataset.
    pub fn list_versions_by_dataset(&self, dataset: &str) -> Result<Vec<Version>> {
        self.metadata.list_versions_by_dataset(dataset)
    }

    /// Every version across every dataset.
    pub fn list_all_versions(&self) -> Result<Vec<Version>> {
        self.metadata.list_all_versions()
    }

    /// Write a batch of entries to a version awaiting them (spec §4.4):
    /// the version must exist, belong to `dataset`, and be `awaiting-entries`;
    /// every `(dataset, table)` referenced must already exist on the dataset.
    pub fn load_entries(&self, request: LoadEntriesRequest) -> Result<usize> {
        let version_id = request.version_id();
        let dataset_name = request.dataset().to_string();

        let version = self
            .metadata
            .get_version(version_id)?
            .ok_or_else(|| Error::not_found("unknown-version", format!("no such version {version_id}")))?;

        if version.dataset != dataset_name {
            return Err(Error::validation(
                "version-dataset-mismatch",
                format!(
                    "version {version_id} belongs to dataset {:?}, not {dataset_name:?}",
                    version.dataset
                ),
            ));
        }
        if version.status != VersionStatus::AwaitingEntries {
            return Err(Error::validation(
                "invalid-version-state",
                format!(
                    "version {version_id} is {}, entries may only load while awaiting-entries",
                    version.status
                ),
            ));
        }

        let rows = request.into_rows();
        if rows.is_empty() {
            return Err(Error::validation("empty-batch", "load-entries requires at least one row"));
        }
        if rows.len() > MAX_BATCH_SIZE {
            return Err(Error::validation(
                "batch-too-large",
                format!("batch of {} rows exceeds the {MAX_BATCH_SIZE}-row limit", rows.len()),
            ));
        }

        let dataset = self
            .metadata
            .get_dataset(&dataset_name)?
            .ok_or_else(|| Error::not_found("unknown-dataset", format!("no such dataset {dataset_name:?}")))?;

        let mut missing = Vec::new();
        for row in &rows {
            if !dataset.tables.contains(&row.table) && !missing.iter().any(|(_, t)| t == &row.table) {
                missing.push((dataset_name.clone(), row.table.clone()));
            }
        }
        if !missing.is_empty() {
            return Err(Error::tables_not_found(missing));
        }

        let count = rows.len();
        for row in rows {
            self.kv.put_entry(&dataset_name, version_id, &row.table, &row.key, row.value)?;
        }
        debug!(version = %version_id, rows = count, "entries loaded");
        Ok(count)
    }

    /// Request a version be saved: `awaiting-entries -> saving`, then enqueue
    /// the `save` action for the worker to finalize.
    pub fn save(&self, version_id: VersionId, audit: Option<BTreeMap<String, Json>>) -> Result<Version> {
        let version = self.metadata.update_status(version_id, VersionStatus::Saving, audit)?;
        self.queue.send(
            &self.operations_topic,
            MessageBody {
                action: Action::Save,
                version_id,
                reason: None,
            },
        )?;
        Ok(version)
    }

    /// Request a version be published: `saved -> publishing`, then enqueue
    /// the `publish` action (the worker performs the revert-then-promote
    /// sequence and calls `activate-version`).
    pub fn publish(&self, version_id: VersionId, audit: Option<BTreeMap<String, Json>>) -> Result<Version> {
        let version = self.metadata.update_status(version_id, VersionStatus::Publishing, audit)?;
        self.queue.send(
            &self.operations_topic,
            MessageBody {
                action: Action::Publish,
                version_id,
                reason: None,
            },
        )?;
        Ok(version)
    }

    /// Discard a version. Terminal; no queue action is enqueued.
    pub fn discard(&self, version_id: VersionId, audit: Option<BTreeMap<String, Json>>) -> Result<Version> {
        self.metadata.update_status(version_id, VersionStatus::Discarded, audit)
    }

    /// Read one entry, resolving `version_id` against the dataset's active
    /// version (cached, ~TTL-stale by design) when not explicitly given.
    pub fn get_entry(
        &self,
        dataset: &str,
        table: &str,
        key: &str,
        version_id: Option<VersionId>,
    ) -> Result<EntryRead> {
        let (resolved, active) = self.resolve_version(dataset, version_id)?;
        let data = self.kv.get_entry(dataset, resolved, table, key)?;
        Ok(EntryRead {
            active_version_id: active,
            version_id: resolved,
            data,
        })
    }

    /// Read every entry in a table, resolving `version_id` the same way as
    /// [`Self::get_entry`].
    pub fn get_entries(
        &self,
        dataset: &str,
        table: &str,
        version_id: Option<VersionId>,
    ) -> Result<EntriesRead> {
        let (resolved, active) = self.resolve_version(dataset, version_id)?;
        let data = self.kv.get_entries(dataset, resolved, table)?;
        Ok(EntriesRead {
            active_version_id: active,
            version_id: resolved,
            data,
        })
    }

    fn resolve_version(&self, dataset: &str, version_id: Option<VersionId>) -> Result<(VersionId, Option<VersionId>)> {
        let found = self.get_dataset_cached(dataset)?;
        let dataset_obj = found.ok_or_else(|| Error::not_found("unknown-dataset", format!("no such dataset {dataset:?}")))?;
        let active = dataset_obj.active_version;
        let resolved = match version_id {
            Some(v) => v,
            None => active.ok_or_else(|| {
                Error::validation("no-active-version", format!("dataset {dataset:?} has no active version yet"))
            })?,
        };
        Ok((resolved, active))
    }

    /// `get-dataset` through the ~10s TTL cache (spec Design Notes). A
    /// transient backend error during a cold load is cached as a miss for
    /// the remainder of the TTL window, same as any other read-through cache.
    fn get_dataset_cached(&self, dataset: &str) -> Result<Option<Dataset>> {
        let mut load_err = None;
        let value = self.dataset_cache.get_or_load(&dataset.to_string(), || match self.metadata.get_dataset(dataset) {
            Ok(found) => found,
            Err(e) => {
                load_err = Some(e);
                None
            }
        });
        match load_err {
            Some(e) => Err(e),
            None => Ok(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vkv_core::contract::{LoadRow, VersionStatus};
    use vkv_storage::{InMemoryKvStore, InMemoryMetadataStore, InMemoryQueue};

    fn orchestrator() -> Orchestrator {
        Orchestrator::new(
            Arc::new(InMemoryMetadataStore::new()),
            Arc::new(InMemoryKvStore::new()),
            Arc::new(InMemoryQueue::new(Duration::from_secs(60))),
            Duration::from_millis(10),
        )
    }

    fn dataset_args(name: &str, tables: &[&str]) -> CreateDatasetArgs {
        CreateDatasetArgs {
            name: name.to_string(),
            tables: tables.iter().map(|t| t.to_string()).collect(),
            eviction_policy: None,
        }
    }

    fn version_args(dataset: &str) -> CreateVersionArgs {
        CreateVersionArgs {
            dataset: dataset.to_string(),
            label: None,
            verification_policy: None,
        }
    }

    #[test]
    fn create_version_enqueues_a_prepare_message() {
        let orch = orchestrator();
        orch.create_dataset(dataset_args("recs", &["items"])).unwrap();
        let version = orch.create_version(version_args("recs")).unwrap();
        assert_eq!(version.status, VersionStatus::Preparing);
    }

    #[test]
    fn load_entries_rejects_a_table_the_dataset_never_declared() {
        let orch = orchestrator();
        orch.create_dataset(dataset_args("recs", &["items"])).unwrap();
        let version = orch.create_version(version_args("recs")).unwrap();
        orch.metadata
            .update_status(version.id, VersionStatus::AwaitingEntries, None)
            .unwrap();

        let request = LoadEntriesRequest::Rows {
            version_id: version.id,
            dataset: "recs".to_string(),
            rows: vec![LoadRow {
                table: "ghost".to_string(),
                key: "k1".to_string(),
                value: b"v1".to_vec(),
            }],
        };
        let err = orch.load_entries(request).unwrap_err();
        assert_eq!(err.kind(), vkv_core::ErrorKind::NotFound);
        assert_eq!(err.detail().tag.as_deref(), Some("tables-not-found"));
    }

    #[test]
    fn load_entries_requires_awaiting_entries_status() {
        let orch = orchestrator();
        orch.create_dataset(dataset_args("recs", &["items"])).unwrap();
        let version = orch.create_version(version_args("recs")).unwrap();

        let request = LoadEntriesRequest::Single {
            version_id: version.id,
            dataset: "recs".to_string(),
            table: "items".to_string(),
            key: "k1".to_string(),
            value: b"v1".to_vec(),
        };
        let err = orch.load_entries(request).unwrap_err();
        assert_eq!(err.detail().tag.as_deref(), Some("invalid-version-state"));
    }

    #[test]
    fn load_entries_rejects_an_empty_batch() {
        let orch = orchestrator();
        orch.create_dataset(dataset_args("recs", &["items"])).unwrap();
        let version = orch.create_version(version_args("recs")).unwrap();
        orch.metadata
            .update_status(version.id, VersionStatus::AwaitingEntries, None)
            .unwrap();

        let request = LoadEntriesRequest::Rows {
            version_id: version.id,
            dataset: "recs".to_string(),
            rows: vec![],
        };
        let err = orch.load_entries(request).unwrap_err();
        assert_eq!(err.detail().tag.as_deref(), Some("empty-batch"));
    }

    #[test]
    fn full_lifecycle_resolves_reads_against_the_active_version() {
        let orch = orchestrator();
        orch.create_dataset(dataset_args("recs", &["items"])).unwrap();
        let version = orch.create_version(version_args("recs")).unwrap();
        orch.metadata
            .update_status(version.id, VersionStatus::AwaitingEntries, None)
            .unwrap();
        orch.load_entries(LoadEntriesRequest::Single {
            version_id: version.id,
            dataset: "recs".to_string(),
            table: "items".to_string(),
            key: "k1".to_string(),
            value: b"v1".to_vec(),
        })
        .unwrap();

        orch.save(version.id, None).unwrap();
        orch.metadata.update_status(version.id, VersionStatus::Saved, None).unwrap();
        orch.publish(version.id, None).unwrap();
        orch.metadata
            .update_status(version.id, VersionStatus::Published, None)
            .unwrap();
        orch.metadata.activate_version(version.id).unwrap();

        let read = orch.get_entry("recs", "items", "k1", None).unwrap();
        assert_eq!(read.active_version_id, Some(version.id));
        assert_eq!(read.data, Some(b"v1".to_vec()));
    }

    #[test]
    fn get_entry_without_an_active_version_is_a_validation_error() {
        let orch = orchestrator();
        orch.create_dataset(dataset_args("recs", &["items"])).unwrap();
        let err = orch.get_entry("recs", "items", "k1", None).unwrap_err();
        assert_eq!(err.kind(), vkv_core::ErrorKind::Validation);
        assert_eq!(err.detail().tag.as_deref(), Some("no-active-version"));
    }
}
