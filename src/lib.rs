//! # versionedkv
//!
//! A transactional, versioned key-value store: datasets hold a lineage of
//! immutable versions, writers stage entries against a draft version and
//! publish it atomically, and readers always see a consistent snapshot.
//!
//! # Quick Start
//!
//! ```no_run
//! use versionedkv::{CreateDatasetArgs, CreateVersionArgs, Store};
//!
//! fn main() -> versionedkv::Result<()> {
//!     let store = Store::in_memory();
//!
//!     store.orchestrator().create_dataset(CreateDatasetArgs {
//!         name: "recs".to_string(),
//!         tables: vec!["items".to_string()],
//!         eviction_policy: None,
//!     })?;
//!     let version = store.orchestrator().create_version(CreateVersionArgs {
//!         dataset: "recs".to_string(),
//!         label: None,
//!         verification_policy: None,
//!     })?;
//!
//!     // `save`/`publish` enqueue work for the async worker; pair a `Store`
//!     // with a running `vkv_worker::Worker` to drive them to completion.
//!     let _ = version;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! [`Store`] wires the three backend contracts (metadata, key-value,
//! queue — see `vkv_core::traits`) to an [`Orchestrator`], the synchronous
//! entry point for every read and write. Writes that require multi-step
//! bookkeeping (`save`, `publish`) enqueue a message for the async worker
//! (`vkv_worker::Worker`) rather than executing inline. The `vkv-http` crate
//! fronts an `Orchestrator` with a JSON-over-HTTP surface; this facade
//! exposes the same entry point for embedding the store directly.
//!
//! Internal crates (`vkv-concurrency`, `vkv-storage`, `vkv-remote`) are
//! implementation detail. Only the re-exports below are part of the stable
//! surface.

#![warn(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

pub use vkv_core::contract::{
    Action, AuditRecord, CreateDatasetArgs, CreateVersionArgs, Dataset, EvictionPolicy, LoadRow,
    MessageBody, QueueMessage, Version, VersionStatus,
};
pub use vkv_core::{Error, ErrorDetail, ErrorKind, KvStore, MetadataStore, Queue, Result};
pub use vkv_core::types::{MessageId, VersionId};
pub use vkv_engine::{EntriesRead, EntryRead, LoadEntriesRequest, Orchestrator, OPERATIONS_TOPIC};
pub use vkv_storage::{EnvelopeKvStore, InMemoryKvStore, InMemoryMetadataStore, InMemoryQueue};
pub use vkv_worker::{Worker, WorkerStopHandle, DEFAULT_POLL_INTERVAL};

/// The read-path dataset cache lifetime an embedded [`Store`] uses (spec
/// Design Notes: "~10s").
const DEFAULT_DATASET_CACHE_TTL: Duration = Duration::from_secs(10);

/// An in-process store: the three backend contracts plus a ready
/// [`Orchestrator`] in front of them.
///
/// A `Store` alone only serves reads and the synchronous half of writes.
/// Pair it with a [`Worker`] polling the same backends (see
/// [`Store::worker`]) to drive `save`/`publish` to completion.
#[derive(Clone)]
pub struct Store {
    metadata: Arc<dyn MetadataStore>,
    kv: Arc<dyn KvStore>,
    queue: Arc<dyn Queue>,
    orchestrator: Arc<Orchestrator>,
}

impl Store {
    /// Build a store over arbitrary backend implementations.
    pub fn new(metadata: Arc<dyn MetadataStore>, kv: Arc<dyn KvStore>, queue: Arc<dyn Queue>) -> Self {
        tracing::debug!("wiring a new store over the provided backends");
        let orchestrator = Arc::new(Orchestrator::new(
            metadata.clone(),
            kv.clone(),
            queue.clone(),
            DEFAULT_DATASET_CACHE_TTL,
        ));
        Store {
            metadata,
            kv,
            queue,
            orchestrator,
        }
    }

    /// Build a store over the in-memory reference backends — no persistence,
    /// no network calls. Reservations lease for `lease_time`.
    pub fn in_memory_with_lease(lease_time: Duration) -> Self {
        Store::new(
            Arc::new(InMemoryMetadataStore::new()),
            Arc::new(InMemoryKvStore::new()),
            Arc::new(InMemoryQueue::new(lease_time)),
        )
    }

    /// Build a store over the in-memory reference backends with a 30 second
    /// default lease time.
    pub fn in_memory() -> Self {
        Store::in_memory_with_lease(Duration::from_secs(30))
    }

    /// The synchronous read/write entry point.
    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    /// Build (but do not start) a [`Worker`] over this store's backends,
    /// polling the given topic. Call `.spawn()` on the result to start it.
    pub fn worker(&self, topic: impl Into<String>) -> Worker {
        Worker::new(self.metadata.clone(), self.kv.clone(), self.queue.clone(), topic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_store_creates_a_dataset() {
        let store = Store::in_memory();
        let dataset = store
            .orchestrator()
            .create_dataset(CreateDatasetArgs {
                name: "recs".to_string(),
                tables: vec!["items".to_string()],
                eviction_policy: None,
            })
            .unwrap();
        assert_eq!(dataset.name, "recs");
        assert!(store.orchestrator().get_dataset("recs").unwrap().is_some());
    }

    #[test]
    fn worker_shares_the_stores_backends() {
        let store = Store::in_memory();
        let worker = store.worker(OPERATIONS_TOPIC);
        assert!(worker.pid().starts_with("worker-"));
    }
}
