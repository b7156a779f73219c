//! The durable queue's message shape (spec §3, §4.3).

use crate::types::MessageId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The action a worker must perform for a staged version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    /// Provision whatever `awaiting-entries` requires.
    Prepare,
    /// Finalize a version's staged entries.
    Save,
    /// Promote a version to be its dataset's active one.
    Publish,
    /// Abandon a version.
    Discard,
    /// Mark a version `failed`; always carries a `reason`.
    Fail,
    /// Run the configured verification policy against a version's data.
    VerifyData,
}

/// The payload of a [`QueueMessage`] on the operations topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageBody {
    /// What the worker should do.
    pub action: Action,
    /// Which version the action applies to.
    pub version_id: crate::types::VersionId,
    /// Present only for `fail` (and any other action that failed en route).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub reason: Option<String>,
}

/// One message on a durable queue topic.
///
/// `ack = true` is terminal: no further mutation is accepted once set.
/// `pid` is empty (`None`) before the first successful `reserve-next`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueMessage {
    /// Opaque, unique, assigned by `send`.
    pub id: MessageId,
    /// The queue topic this message was sent on.
    pub topic: String,
    /// When the message was sent.
    pub timestamp: DateTime<Utc>,
    /// The action payload.
    pub body: MessageBody,
    /// Current lease holder, if any.
    #[serde(default)]
    pub pid: Option<String>,
    /// Lease expiry; meaningless while `pid` is `None`.
    #[serde(default)]
    pub lease_deadline: Option<DateTime<Utc>>,
    /// Whether the message has been acknowledged. Terminal once `true`.
    #[serde(default)]
    pub ack: bool,
    /// Monotonic CAS counter (`__ver`), mirrors the metadata store's.
    pub cas: u64,
}

impl QueueMessage {
    /// Build a freshly-sent, unreserved message.
    pub fn new(topic: impl Into<String>, body: MessageBody) -> Self {
        QueueMessage {
            id: MessageId::new(),
            topic: topic.into(),
            timestamp: Utc::now(),
            body,
            pid: None,
            lease_deadline: None,
            ack: false,
            cas: 0,
        }
    }

    /// A message is reservable iff not acknowledged and its lease (if any)
    /// has expired (spec §4.3 "Reservation rule").
    pub fn is_reservable(&self, now: DateTime<Utc>) -> bool {
        if self.ack {
            return false;
        }
        match self.lease_deadline {
            None => true,
            Some(deadline) => now > deadline,
        }
    }

    /// Classification used by `list(filter)` (spec §4.3 "Filtering semantics").
    pub fn status(&self, now: DateTime<Utc>) -> MessageStatus {
        if self.ack {
            return MessageStatus::Acknowledged;
        }
        match self.lease_deadline {
            None => MessageStatus::New,
            Some(deadline) if now > deadline => MessageStatus::Expired,
            Some(_) => MessageStatus::Reserved,
        }
    }
}

/// The `status` values accepted by `list(filter)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageStatus {
    /// Never reserved, not acknowledged.
    New,
    /// Has a live lease, not acknowledged.
    Reserved,
    /// Had a lease that expired, not acknowledged.
    Expired,
    /// Acknowledged; terminal.
    Acknowledged,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn body() -> MessageBody {
        MessageBody {
            action: Action::Prepare,
            version_id: crate::types::VersionId::new(),
            reason: None,
        }
    }

    #[test]
    fn fresh_message_is_new_and_reservable() {
        let msg = QueueMessage::new("ops", body());
        let now = Utc::now();
        assert_eq!(msg.status(now), MessageStatus::New);
        assert!(msg.is_reservable(now));
    }

    #[test]
    fn live_lease_is_reserved_and_not_reservable() {
        let mut msg = QueueMessage::new("ops", body());
        let now = Utc::now();
        msg.pid = Some("worker-1".to_string());
        msg.lease_deadline = Some(now + Duration::seconds(60));
        assert_eq!(msg.status(now), MessageStatus::Reserved);
        assert!(!msg.is_reservable(now));
    }

    #[test]
    fn expired_lease_is_expired_and_reservable_again() {
        let mut msg = QueueMessage::new("ops", body());
        let now = Utc::now();
        msg.pid = Some("worker-1".to_string());
        msg.lease_deadline = Some(now - Duration::seconds(1));
        assert_eq!(msg.status(now), MessageStatus::Expired);
        assert!(msg.is_reservable(now));
    }

    #[test]
    fn acknowledged_is_terminal_regardless_of_lease() {
        let mut msg = QueueMessage::new("ops", body());
        let now = Utc::now();
        msg.ack = true;
        msg.lease_deadline = Some(now - Duration::seconds(1));
        assert_eq!(msg.status(now), MessageStatus::Acknowledged);
        assert!(!msg.is_reservable(now));
    }
}
