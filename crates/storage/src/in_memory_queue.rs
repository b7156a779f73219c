//! The in-memory `Queue` backend: lease-based reservation over a `DashMap`,
//! first-N-by-timestamp candidate selection (spec §4.3).

use chrono::Utc;
use dashmap::DashMap;
use std::time::Duration;
use vkv_concurrency::{cas, lease};
use vkv_core::contract::{MessageBody, MessageStatus, QueueMessage};
use vkv_core::limits::RESERVE_CANDIDATE_WINDOW;
use vkv_core::traits::ListFilter;
use vkv_core::types::MessageId;
use vkv_core::{Error, Queue, Result};

/// How many times `reserve_next` restarts candidate selection after losing
/// a CAS race before giving up (spec: "on collision retry the selection
/// from scratch").
const MAX_RESERVE_ROUNDS: usize = 4;

/// An in-process `Queue`.
pub struct InMemoryQueue {
    messages: DashMap<MessageId, QueueMessage>,
    lease_time: Duration,
}

impl InMemoryQueue {
    /// Build a queue whose reservations hold for `lease_time`.
    pub fn new(lease_time: Duration) -> Self {
        InMemoryQueue {
            messages: DashMap::new(),
            lease_time,
        }
    }
}

impl Queue for InMemoryQueue {
    fn send(&self, topic: &str, body: MessageBody) -> Result<MessageId> {
        let message = QueueMessage::new(topic, body);
        let id = message.id;
        self.messages.insert(id, message);
        Ok(id)
    }

    fn send_with_id(&self, topic: &str, id: MessageId, body: MessageBody) -> Result<()> {
        self.messages.entry(id).or_insert_with(|| {
            let mut message = QueueMessage::new(topic, body);
            message.id = id;
            message
        });
        Ok(())
    }

    fn reserve_next(&self, topic: &str, pid: &str) -> Result<QueueMessage> {
        let now = Utc::now();
        for _round in 0..MAX_RESERVE_ROUNDS {
            let mut candidates: Vec<(MessageId, chrono::DateTime<Utc>)> = self
                .messages
                .iter()
                .filter(|r| r.topic == topic && r.is_reservable(now))
                .map(|r| (*r.key(), r.timestamp))
                .collect();
            candidates.sort_by_key(|(_, ts)| *ts);
            candidates.truncate(RESERVE_CANDIDATE_WINDOW);

            for (id, _) in candidates {
                if let Some(mut entry) = self.messages.get_mut(&id) {
                    if entry.is_reservable(now) {
                        entry.pid = Some(pid.to_string());
                        entry.lease_deadline = Some(lease::reserve_deadline(now, self.lease_time));
                        entry.cas = cas::advance(entry.cas);
                        return Ok(entry.clone());
                    }
                }
            }
        }
        Err(Error::not_found(
            "no-message",
            format!("no reservable message on topic {topic:?}"),
        ))
    }

    fn acknowledge(&self, id: MessageId, pid: &str) -> Result<()> {
        let mut entry = self.messages.get_mut(&id).ok_or_else(|| {
            Error::not_found("no-message", format!("no such message {id}"))
        })?;
        // ack is idempotent: short-circuit before the owner check (spec §4.3
        // rule 2 — preserve this short-circuit even though it means a stale
        // caller's pid is never checked against an already-acked message).
        if entry.ack {
            return Ok(());
        }
        if entry.pid.as_deref() != Some(pid) {
            return Err(Error::conflict(format!("message {id} owned by a different pid")));
        }
        if Utc::now() > entry.lease_deadline.unwrap_or_else(Utc::now) {
            return Err(Error::conflict(format!("lease on message {id} has expired")));
        }
        entry.ack = true;
        entry.cas = cas::advance(entry.cas);
        Ok(())
    }

    fn extend_lease(&self, id: MessageId, pid: &str) -> Result<()> {
        let mut entry = self.messages.get_mut(&id).ok_or_else(|| {
            Error::not_found("no-message", format!("no such message {id}"))
        })?;
        if entry.ack {
            return Err(Error::conflict(format!(
                "message {id} is already acknowledged"
            )));
        }
        if entry.pid.as_deref() != Some(pid) {
            return Err(Error::conflict(format!("message {id} owned by a different pid")));
        }
        let now = Utc::now();
        if now > entry.lease_deadline.unwrap_or(now) {
            return Err(Error::conflict(format!("lease on message {id} has expired")));
        }
        entry.lease_deadline = Some(lease::extend_deadline(
            entry.lease_deadline.unwrap_or(now),
            now,
            self.lease_time,
        ));
        entry.cas = cas::advance(entry.cas);
        Ok(())
    }

    fn list(&self, filter: ListFilter) -> Result<Vec<QueueMessage>> {
        let now = Utc::now();
        Ok(self
            .messages
            .iter()
            .filter(|r| r.topic == filter.topic)
            .filter(|r| match &filter.status {
                Some(status) => r.status(now) == *status,
                None => true,
            })
            .filter(|r| match &filter.pid {
                Some(pid) => r.pid.as_deref() == Some(pid.as_str()),
                None => true,
            })
            .map(|r| r.value().clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vkv_core::contract::Action;
    use vkv_core::types::VersionId;

    fn body() -> MessageBody {
        MessageBody {
            action: Action::Prepare,
            version_id: VersionId::new(),
            reason: None,
        }
    }

    #[test]
    fn reserve_then_extend_then_ack_succeeds_within_lease() {
        let q = InMemoryQueue::new(Duration::from_secs(60));
        let id = q.send("ops", body()).unwrap();
        let reserved = q.reserve_next("ops", "worker-1").unwrap();
        assert_eq!(reserved.id, id);
        q.extend_lease(id, "worker-1").unwrap();
        q.acknowledge(id, "worker-1").unwrap();
    }

    #[test]
    fn ack_is_idempotent() {
        let q = InMemoryQueue::new(Duration::from_secs(60));
        let id = q.send("ops", body()).unwrap();
        q.reserve_next("ops", "worker-1").unwrap();
        q.acknowledge(id, "worker-1").unwrap();
        assert!(q.acknowledge(id, "anyone-at-all").is_ok());
    }

    #[test]
    fn acknowledged_message_is_never_reserved_again() {
        let q = InMemoryQueue::new(Duration::from_secs(60));
        let id = q.send("ops", body()).unwrap();
        q.reserve_next("ops", "worker-1").unwrap();
        q.acknowledge(id, "worker-1").unwrap();
        let err = q.reserve_next("ops", "worker-2").unwrap_err();
        assert_eq!(err.kind(), vkv_core::ErrorKind::NotFound);
    }

    #[test]
    fn wrong_owner_is_rejected() {
        let q = InMemoryQueue::new(Duration::from_secs(60));
        let id = q.send("ops", body()).unwrap();
        q.reserve_next("ops", "worker-1").unwrap();
        let err = q.acknowledge(id, "worker-2").unwrap_err();
        assert_eq!(err.kind(), vkv_core::ErrorKind::Conflict);
    }

    #[test]
    fn expired_lease_becomes_reservable_again_with_same_id() {
        let q = InMemoryQueue::new(Duration::from_millis(1));
        let id = q.send("ops", body()).unwrap();
        let first = q.reserve_next("ops", "worker-1").unwrap();
        assert_eq!(first.id, id);
        std::thread::sleep(Duration::from_millis(5));
        let second = q.reserve_next("ops", "worker-2").unwrap();
        assert_eq!(second.id, id);
    }

    #[test]
    fn extend_lease_after_ack_fails_not_idempotent() {
        let q = InMemoryQueue::new(Duration::from_secs(60));
        let id = q.send("ops", body()).unwrap();
        q.reserve_next("ops", "worker-1").unwrap();
        q.acknowledge(id, "worker-1").unwrap();
        let err = q.extend_lease(id, "worker-1").unwrap_err();
        assert_eq!(err.kind(), vkv_core::ErrorKind::Conflict);
    }

    #[test]
    fn list_filters_by_status() {
        let q = InMemoryQueue::new(Duration::from_secs(60));
        q.send("ops", body()).unwrap();
        q.send("ops", body()).unwrap();
        let reserved_id = q.reserve_next("ops", "worker-1").unwrap().id;

        let new = q
            .list(ListFilter {
                topic: "ops".to_string(),
                status: Some(MessageStatus::New),
                pid: None,
            })
            .unwrap();
        assert_eq!(new.len(), 1);

        let reserved = q
            .list(ListFilter {
                topic: "ops".to_string(),
                status: Some(MessageStatus::Reserved),
                pid: None,
            })
            .unwrap();
        assert_eq!(reserved.len(), 1);
        assert_eq!(reserved[0].id, reserved_id);
    }
}
