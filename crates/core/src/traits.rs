//! Backend contracts: [`MetadataStore`], [`KvStore`], and [`Queue`].
//!
//! These traits let the orchestrator and worker run unchanged against an
//! in-memory backend or a remote document-store backend. All methods must
//! be safe to call concurrently from multiple threads.

use crate::contract::{
    CreateDatasetArgs, CreateVersionArgs, Dataset, MessageBody, OperationLog, QueueMessage,
    Version, VersionStatus,
};
use crate::error::Result;
use crate::types::{MessageId, VersionId};
use serde_json::Value as Json;
use std::collections::BTreeMap;

/// Persists [`Dataset`]s and [`Version`]s and enforces the version lifecycle
/// state machine (spec §4.1).
///
/// # Errors
///
/// Every write validates its argument shape before touching storage;
/// invalid shapes fail with [`crate::error::Error::Validation`] before any
/// mutation is attempted.
pub trait MetadataStore: Send + Sync {
    /// Create a dataset. Fails with `Conflict` if the name is already taken.
    fn create_dataset(&self, args: CreateDatasetArgs) -> Result<Dataset>;

    /// Fetch a dataset by name; `Ok(None)` if absent (not an error).
    fn get_dataset(&self, name: &str) -> Result<Option<Dataset>>;

    /// All datasets, in an unspecified but stable order.
    fn list_datasets(&self) -> Result<Vec<Dataset>>;

    /// Create a version in `preparing` state. Fails with `NotFound` if the
    /// named dataset does not exist.
    fn create_version(&self, args: CreateVersionArgs) -> Result<Version>;

    /// All versions belonging to one dataset.
    fn list_versions_by_dataset(&self, dataset: &str) -> Result<Vec<Version>>;

    /// Every version across every dataset.
    fn list_all_versions(&self) -> Result<Vec<Version>>;

    /// Fetch a version by id; `Ok(None)` if absent.
    fn get_version(&self, id: VersionId) -> Result<Option<Version>>;

    /// Move a version to `target`, appending one audit record. Fails with
    /// `Conflict` if `target` is not reachable from the version's current
    /// status (see [`VersionStatus::can_transition_to`]).
    fn update_status(
        &self,
        version_id: VersionId,
        target: VersionStatus,
        audit: Option<BTreeMap<String, Json>>,
    ) -> Result<Version>;

    /// Set `dataset.active-version` to `version_id` (invariant 5).
    fn activate_version(&self, version_id: VersionId) -> Result<Dataset>;
}

/// Stores opaque entry values under `(dataset, version, table, key)`.
///
/// Entries may only be written while their owning version is
/// `awaiting-entries` (invariant 6); callers, not this trait, enforce that —
/// the store itself is a dumb bag of bytes.
pub trait KvStore: Send + Sync {
    /// Write one entry, overwriting any existing value at the same key.
    fn put_entry(
        &self,
        dataset: &str,
        version: VersionId,
        table: &str,
        key: &str,
        value: Vec<u8>,
    ) -> Result<()>;

    /// Fetch one entry; `Ok(None)` if absent.
    fn get_entry(
        &self,
        dataset: &str,
        version: VersionId,
        table: &str,
        key: &str,
    ) -> Result<Option<Vec<u8>>>;

    /// Fetch every entry in `table` for `version`, keyed by entry key.
    fn get_entries(
        &self,
        dataset: &str,
        version: VersionId,
        table: &str,
    ) -> Result<BTreeMap<String, Vec<u8>>>;

    /// Remove every entry belonging to `version` (used on discard).
    fn delete_version_entries(&self, dataset: &str, version: VersionId) -> Result<()>;
}

/// Optional filter accepted by [`Queue::list`].
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    /// Mandatory topic to restrict the listing to.
    pub topic: String,
    /// Optional status filter (spec §4.3 "Filtering semantics").
    pub status: Option<crate::contract::MessageStatus>,
    /// Optional lease-holder filter.
    pub pid: Option<String>,
}

/// A durable, lease-based, at-least-once message queue (spec §4.3).
pub trait Queue: Send + Sync {
    /// Enqueue `body` on `topic`, returning a freshly generated id.
    fn send(&self, topic: &str, body: MessageBody) -> Result<MessageId>;

    /// Enqueue `body` on `topic` under a caller-supplied id. Idempotent: a
    /// second call with the same id is a no-op that still returns `Ok`.
    fn send_with_id(&self, topic: &str, id: MessageId, body: MessageBody) -> Result<()>;

    /// Atomically reserve the next reservable message on `topic` for `pid`.
    /// Fails with `NotFound` (spec's `NoMessage`) if none qualify.
    fn reserve_next(&self, topic: &str, pid: &str) -> Result<QueueMessage>;

    /// Acknowledge `id` as `pid`. Idempotent once already acknowledged.
    fn acknowledge(&self, id: MessageId, pid: &str) -> Result<()>;

    /// Extend `id`'s lease as `pid`. Not idempotent past acknowledgement.
    fn extend_lease(&self, id: MessageId, pid: &str) -> Result<()>;

    /// List messages on `filter.topic` matching the remaining filter fields.
    fn list(&self, filter: ListFilter) -> Result<Vec<QueueMessage>>;
}
