//! The async worker loop (spec §4.5): reserves messages, dispatches to a
//! handler, and acknowledges on success — on handler failure the message is
//! left unacked, to be retried once its lease expires. Runs on a dedicated
//! OS thread, not a tokio task (spec §5: "Parallel threads (or equivalent
//! lightweight tasks)").

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{error, info, warn};
use uuid::Uuid;

use vkv_core::contract::QueueMessage;
use vkv_core::{ErrorKind, KvStore, MetadataStore, Queue};

use crate::handlers;

/// Default interval a worker sleeps between queue polls when nothing is
/// reservable (spec §4.5: "On NoMessage, sleep poll-interval and retry").
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Reserves and processes messages from the operations topic until stopped.
pub struct Worker {
    metadata: Arc<dyn MetadataStore>,
    kv: Arc<dyn KvStore>,
    queue: Arc<dyn Queue>,
    topic: String,
    pid: String,
    poll_interval: Duration,
    shutdown: Arc<AtomicBool>,
}

impl Worker {
    /// Build a worker with a freshly generated, stable `pid`, polling
    /// `topic` on the given backends.
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        kv: Arc<dyn KvStore>,
        queue: Arc<dyn Queue>,
        topic: impl Into<String>,
    ) -> Self {
        Worker {
            metadata,
            kv,
            queue,
            topic: topic.into(),
            pid: format!("worker-{}", Uuid::new_v4()),
            poll_interval: DEFAULT_POLL_INTERVAL,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Override the default poll interval — tests want this short.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// This worker's stable pid, used as the lease owner on every reservation.
    pub fn pid(&self) -> &str {
        &self.pid
    }

    /// A handle other threads can use to request this worker's loop stop.
    pub fn stop_handle(&self) -> WorkerStopHandle {
        WorkerStopHandle {
            shutdown: Arc::clone(&self.shutdown),
        }
    }

    /// Run the reserve-dispatch-ack loop until stopped. Blocks the calling
    /// thread — spawn via [`Self::spawn`] to run it in the background.
    pub fn run(&self) {
        info!(pid = %self.pid, topic = %self.topic, "worker loop starting");
        while !self.shutdown.load(Ordering::Acquire) {
            match self.queue.reserve_next(&self.topic, &self.pid) {
                Ok(message) => self.process(message),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    std::thread::sleep(self.poll_interval);
                }
                Err(e) => {
                    error!(error = %e, "unexpected error reserving the next message");
                    std::thread::sleep(self.poll_interval);
                }
            }
        }
        info!(pid = %self.pid, "worker loop stopped");
    }

    /// Spawn this worker's loop on a dedicated, named OS thread.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        let pid = self.pid.clone();
        std::thread::Builder::new()
            .name(pid)
            .spawn(move || self.run())
            .expect("failed to spawn worker thread")
    }

    fn process(&self, message: QueueMessage) {
        let result = handlers::dispatch(
            self.metadata.as_ref(),
            self.kv.as_ref(),
            self.queue.as_ref(),
            &self.topic,
            &message.body,
        );
        match result {
            Ok(()) => {
                if let Err(e) = self.queue.acknowledge(message.id, &self.pid) {
                    error!(message = %message.id, error = %e, "failed to acknowledge a successfully handled message");
                }
            }
            Err(e) => {
                warn!(
                    message = %message.id,
                    action = ?message.body.action,
                    error = %e,
                    "handler failed, leaving message unacked for retry"
                );
            }
        }
    }
}

/// A handle that signals a running [`Worker`] to stop after its current
/// iteration (spec §4.5 "Cancellation": in-flight handler work is not
/// interrupted).
#[derive(Clone)]
pub struct WorkerStopHandle {
    shutdown: Arc<AtomicBool>,
}

impl WorkerStopHandle {
    /// Request the worker loop exit at its next iteration.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vkv_core::contract::{CreateDatasetArgs, CreateVersionArgs, VersionStatus};
    use vkv_storage::{InMemoryKvStore, InMemoryMetadataStore, InMemoryQueue};

    #[test]
    fn worker_processes_a_prepare_message_then_stops_cleanly() {
        let metadata = Arc::new(InMemoryMetadataStore::new());
        let kv = Arc::new(InMemoryKvStore::new());
        let queue: Arc<InMemoryQueue> = Arc::new(InMemoryQueue::new(Duration::from_secs(60)));

        metadata
            .create_dataset(CreateDatasetArgs {
                name: "recs".to_string(),
                tables: vec!["items".to_string()],
                eviction_policy: None,
            })
            .unwrap();
        let version = metadata
            .create_version(CreateVersionArgs {
                dataset: "recs".to_string(),
                label: None,
                verification_policy: None,
            })
            .unwrap();
        queue
            .send(
                "vkv-operations",
                vkv_core::contract::MessageBody {
                    action: vkv_core::contract::Action::Prepare,
                    version_id: version.id,
                    reason: None,
                },
            )
            .unwrap();

        let worker = Arc::new(
            Worker::new(metadata.clone(), kv, queue, "vkv-operations")
                .with_poll_interval(Duration::from_millis(10)),
        );
        let stop = worker.stop_handle();
        let handle = worker.clone().spawn();

        let mut attempts = 0;
        loop {
            let current = metadata.get_version(version.id).unwrap().unwrap();
            if current.status == VersionStatus::AwaitingEntries {
                break;
            }
            attempts += 1;
            assert!(attempts < 200, "worker never processed the prepare message");
            std::thread::sleep(Duration::from_millis(10));
        }

        stop.stop();
        handle.join().unwrap();
    }
}
