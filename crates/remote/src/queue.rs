//! `Queue` backed by the remote document store, using the composite
//! secondary-key scheme the spec suggests (§4.3 "Storage hint for remote
//! backend"): `{topic}|{N,R,A}|{zero-padded-timestamp}`.

use crate::client::RemoteDocStoreClient;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use vkv_concurrency::{cas, lease};
use vkv_core::contract::{MessageBody, QueueMessage};
use vkv_core::limits::RESERVE_CANDIDATE_WINDOW;
use vkv_core::traits::ListFilter;
use vkv_core::types::MessageId;
use vkv_core::{Error, Queue, Result};

const MESSAGES: &str = "queue";
const MAX_RESERVE_ROUNDS: usize = 4;

#[derive(Serialize, Deserialize)]
struct StoredMessage {
    #[serde(flatten)]
    message: QueueMessage,
    status_key: String,
}

fn status_char(message: &QueueMessage, now: chrono::DateTime<Utc>) -> char {
    use vkv_core::contract::MessageStatus::*;
    match message.status(now) {
        New | Expired => 'N',
        Reserved => 'R',
        Acknowledged => 'A',
    }
}

fn status_key(message: &QueueMessage, now: chrono::DateTime<Utc>) -> String {
    format!(
        "{}|{}|{:020}",
        message.topic,
        status_char(message, now),
        message.timestamp.timestamp_millis()
    )
}

/// A `Queue` whose messages live in a remote document store.
pub struct RemoteQueue {
    client: RemoteDocStoreClient,
    lease_time: Duration,
}

impl RemoteQueue {
    /// Wrap an already-configured client; reservations hold for `lease_time`.
    pub fn new(client: RemoteDocStoreClient, lease_time: Duration) -> Self {
        RemoteQueue { client, lease_time }
    }

    fn load(&self, id: MessageId) -> Result<StoredMessage> {
        let doc = self
            .client
            .get(MESSAGES, &id.to_string())?
            .ok_or_else(|| Error::not_found("no-message", format!("no such message {id}")))?;
        serde_json::from_value(doc).map_err(|e| Error::internal(format!("deserialize failed: {e}")))
    }

    fn store(&self, stored: &StoredMessage, expected_cas: u64) -> Result<()> {
        let doc = serde_json::to_value(stored)
            .map_err(|e| Error::internal(format!("serialize failed: {e}")))?;
        self.client
            .put_if_match(MESSAGES, &stored.message.id.to_string(), &doc, expected_cas)
    }
}

impl Queue for RemoteQueue {
    fn send(&self, topic: &str, body: MessageBody) -> Result<MessageId> {
        let message = QueueMessage::new(topic, body);
        let id = message.id;
        let now = Utc::now();
        let stored = StoredMessage {
            status_key: status_key(&message, now),
            message,
        };
        let doc = serde_json::to_value(&stored)
            .map_err(|e| Error::internal(format!("serialize failed: {e}")))?;
        self.client.create(MESSAGES, &id.to_string(), &doc)?;
        Ok(id)
    }

    fn send_with_id(&self, topic: &str, id: MessageId, body: MessageBody) -> Result<()> {
        let mut message = QueueMessage::new(topic, body);
        message.id = id;
        let now = Utc::now();
        let stored = StoredMessage {
            status_key: status_key(&message, now),
            message,
        };
        let doc = serde_json::to_value(&stored)
            .map_err(|e| Error::internal(format!("serialize failed: {e}")))?;
        match self.client.create(MESSAGES, &id.to_string(), &doc) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == vkv_core::ErrorKind::Conflict => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn reserve_next(&self, topic: &str, pid: &str) -> Result<QueueMessage> {
        let now = Utc::now();
        for _round in 0..MAX_RESERVE_ROUNDS {
            let mut candidates = Vec::new();
            for flag in ['N', 'R'] {
                let prefix = format!("{topic}|{flag}|");
                for (_, doc) in self.client.query_prefix(MESSAGES, &prefix)? {
                    if let Ok(stored) = serde_json::from_value::<StoredMessage>(doc) {
                        if stored.message.is_reservable(now) {
                            candidates.push(stored.message);
                        }
                    }
                }
            }
            candidates.sort_by_key(|m| m.timestamp);
            candidates.truncate(RESERVE_CANDIDATE_WINDOW);

            for mut message in candidates {
                let expected_cas = message.cas;
                message.pid = Some(pid.to_string());
                message.lease_deadline = Some(lease::reserve_deadline(now, self.lease_time));
                message.cas = cas::advance(message.cas);
                let stored = StoredMessage {
                    status_key: status_key(&message, now),
                    message: message.clone(),
                };
                match self.store(&stored, expected_cas) {
                    Ok(()) => return Ok(message),
                    Err(e) if e.kind() == vkv_core::ErrorKind::Conflict => continue,
                    Err(e) => return Err(e),
                }
            }
        }
        Err(Error::not_found(
            "no-message",
            format!("no reservable message on topic {topic:?}"),
        ))
    }

    fn acknowledge(&self, id: MessageId, pid: &str) -> Result<()> {
        let mut stored = self.load(id)?;
        if stored.message.ack {
            return Ok(());
        }
        if stored.message.pid.as_deref() != Some(pid) {
            return Err(Error::conflict(format!("message {id} owned by a different pid")));
        }
        let now = Utc::now();
        if now > stored.message.lease_deadline.unwrap_or(now) {
            return Err(Error::conflict(format!("lease on message {id} has expired")));
        }
        let expected_cas = stored.message.cas;
        stored.message.ack = true;
        stored.message.cas = cas::advance(stored.message.cas);
        stored.status_key = status_key(&stored.message, now);
        self.store(&stored, expected_cas)
    }

    fn extend_lease(&self, id: MessageId, pid: &str) -> Result<()> {
        let mut stored = self.load(id)?;
        if stored.message.ack {
            return Err(Error::conflict(format!(
                "message {id} is already acknowledged"
            )));
        }
        if stored.message.pid.as_deref() != Some(pid) {
            return Err(Error::conflict(format!("message {id} owned by a different pid")));
        }
        let now = Utc::now();
        if now > stored.message.lease_deadline.unwrap_or(now) {
            return Err(Error::conflict(format!("lease on message {id} has expired")));
        }
        let expected_cas = stored.message.cas;
        stored.message.lease_deadline = Some(lease::extend_deadline(
            stored.message.lease_deadline.unwrap_or(now),
            now,
            self.lease_time,
        ));
        stored.message.cas = cas::advance(stored.message.cas);
        stored.status_key = status_key(&stored.message, now);
        self.store(&stored, expected_cas)
    }

    fn list(&self, filter: ListFilter) -> Result<Vec<QueueMessage>> {
        let now = Utc::now();
        let prefix = format!("{}|", filter.topic);
        let mut out = Vec::new();
        for (_, doc) in self.client.query_prefix(MESSAGES, &prefix)? {
            let stored: StoredMessage = serde_json::from_value(doc)
                .map_err(|e| Error::internal(format!("deserialize failed: {e}")))?;
            if let Some(status) = &filter.status {
                if stored.message.status(now) != *status {
                    continue;
                }
            }
            if let Some(pid) = &filter.pid {
                if stored.message.pid.as_deref() != Some(pid.as_str()) {
                    continue;
                }
            }
            out.push(stored.message);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vkv_core::contract::Action;
    use vkv_core::types::VersionId;

    fn message() -> QueueMessage {
        QueueMessage::new(
            "ops",
            MessageBody {
                action: Action::Prepare,
                version_id: VersionId::new(),
                reason: None,
            },
        )
    }

    #[test]
    fn status_key_sorts_lexicographically_by_timestamp() {
        let now = Utc::now();
        let earlier = message();
        let mut later = message();
        later.timestamp = earlier.timestamp + chrono::Duration::seconds(1);
        assert!(status_key(&earlier, now) < status_key(&later, now));
    }

    #[test]
    fn status_key_prefix_matches_topic_and_flag() {
        let now = Utc::now();
        let msg = message();
        let key = status_key(&msg, now);
        assert!(key.starts_with("ops|N|"));
    }

    #[test]
    fn reserved_message_gets_the_r_flag() {
        let now = Utc::now();
        let mut msg = message();
        msg.pid = Some("worker-1".to_string());
        msg.lease_deadline = Some(now + chrono::Duration::seconds(60));
        assert!(status_key(&msg, now).starts_with("ops|R|"));
    }
}
