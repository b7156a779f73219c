//! Action handlers dispatched by the worker loop (spec §4.5).

use std::collections::BTreeMap;

use serde_json::Value as Json;
use tracing::warn;

use vkv_core::contract::{Action, MessageBody, VersionStatus};
use vkv_core::types::VersionId;
use vkv_core::{Error, KvStore, MetadataStore, Queue, Result};

/// Run the handler for `body.action`.
pub fn dispatch(
    metadata: &dyn MetadataStore,
    kv: &dyn KvStore,
    queue: &dyn Queue,
    topic: &str,
    body: &MessageBody,
) -> Result<()> {
    match body.action {
        Action::Prepare => prepare(metadata, body.version_id),
        Action::Save => save(metadata, body.version_id),
        Action::Publish => publish(metadata, body.version_id),
        Action::Discard => discard(metadata, kv, body.version_id, body.reason.clone()),
        Action::Fail => fail(metadata, body.version_id, body.reason.clone()),
        Action::VerifyData => verify_data(queue, topic, body.version_id),
    }
}

fn reason_audit(reason: Option<String>) -> Option<BTreeMap<String, Json>> {
    reason.map(|r| {
        let mut context = BTreeMap::new();
        context.insert("reason".to_string(), Json::from(r));
        context
    })
}

/// Safe to re-deliver: a version already sitting at `target` is left alone
/// rather than re-validated against `can_transition_to`, which would reject
/// the redelivery even though the handler already succeeded once.
fn move_to(metadata: &dyn MetadataStore, version_id: VersionId, target: VersionStatus) -> Result<()> {
    let version = metadata
        .get_version(version_id)?
        .ok_or_else(|| Error::not_found("unknown-version", format!("no such version {version_id}")))?;
    if version.status != target {
        metadata.update_status(version_id, target, None)?;
    }
    Ok(())
}

fn prepare(metadata: &dyn MetadataStore, version_id: VersionId) -> Result<()> {
    move_to(metadata, version_id, VersionStatus::AwaitingEntries)
}

fn save(metadata: &dyn MetadataStore, version_id: VersionId) -> Result<()> {
    move_to(metadata, version_id, VersionStatus::Saved)
}

/// Atomically (from the caller's perspective): revert every other currently
/// `published` version of the same dataset to `saved`, promote the target to
/// `published`, then flip `dataset.active-version`. Safe to re-deliver: each
/// step re-derives its precondition from current state rather than assuming
/// the prior attempt never ran (spec §4.5).
fn publish(metadata: &dyn MetadataStore, version_id: VersionId) -> Result<()> {
    let version = metadata
        .get_version(version_id)?
        .ok_or_else(|| Error::not_found("unknown-version", format!("no such version {version_id}")))?;

    for other in metadata.list_versions_by_dataset(&version.dataset)? {
        if other.id != version_id && other.status == VersionStatus::Published {
            let mut audit = BTreeMap::new();
            audit.insert("initiated-by".to_string(), Json::from("publish-handler"));
            metadata.update_status(other.id, VersionStatus::Saved, Some(audit))?;
        }
    }

    let current = metadata
        .get_version(version_id)?
        .ok_or_else(|| Error::not_found("unknown-version", format!("no such version {version_id}")))?;
    if current.status != VersionStatus::Published {
        metadata.update_status(version_id, VersionStatus::Published, None)?;
    }

    metadata.activate_version(version_id)?;
    Ok(())
}

fn discard(metadata: &dyn MetadataStore, kv: &dyn KvStore, version_id: VersionId, reason: Option<String>) -> Result<()> {
    let version = metadata
        .get_version(version_id)?
        .ok_or_else(|| Error::not_found("unknown-version", format!("no such version {version_id}")))?;
    metadata.update_status(version_id, VersionStatus::Discarded, reason_audit(reason))?;
    kv.delete_version_entries(&version.dataset, version_id)
}

fn fail(metadata: &dyn MetadataStore, version_id: VersionId, reason: Option<String>) -> Result<()> {
    metadata.update_status(version_id, VersionStatus::Failed, reason_audit(reason))?;
    Ok(())
}

/// No verification policy engine exists in this core (spec §4.5: reserved
/// extension point). A `verify-data` message that does arrive is treated as
/// a trivial pass and forwarded on to `save`.
fn verify_data(queue: &dyn Queue, topic: &str, version_id: VersionId) -> Result<()> {
    warn!(version = %version_id, "verify-data has no configured policy, passing through to save");
    queue.send(
        topic,
        MessageBody {
            action: Action::Save,
            version_id,
            reason: None,
        },
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use vkv_core::contract::{CreateDatasetArgs, CreateVersionArgs};
    use vkv_core::traits::ListFilter;
    use vkv_storage::{InMemoryKvStore, InMemoryMetadataStore, InMemoryQueue};

    fn backends() -> (InMemoryMetadataStore, InMemoryKvStore, InMemoryQueue) {
        (
            InMemoryMetadataStore::new(),
            InMemoryKvStore::new(),
            InMemoryQueue::new(Duration::from_secs(60)),
        )
    }

    fn dataset(metadata: &InMemoryMetadataStore, name: &str, tables: &[&str]) {
        metadata
            .create_dataset(CreateDatasetArgs {
                name: name.to_string(),
                tables: tables.iter().map(|t| t.to_string()).collect(),
                eviction_policy: None,
            })
            .unwrap();
    }

    #[test]
    fn prepare_moves_version_to_awaiting_entries() {
        let (metadata, kv, queue) = backends();
        dataset(&metadata, "recs", &["items"]);
        let version = metadata
            .create_version(CreateVersionArgs {
                dataset: "recs".to_string(),
                label: None,
                verification_policy: None,
            })
            .unwrap();

        dispatch(
            &metadata,
            &kv,
            &queue,
            "ops",
            &MessageBody {
                action: Action::Prepare,
                version_id: version.id,
                reason: None,
            },
        )
        .unwrap();

        let updated = metadata.get_version(version.id).unwrap().unwrap();
        assert_eq!(updated.status, VersionStatus::AwaitingEntries);
    }

    #[test]
    fn publish_reverts_the_previously_published_version_and_activates_the_new_one() {
        let (metadata, kv, queue) = backends();
        dataset(&metadata, "recs", &["items"]);

        let v1 = metadata
            .create_version(CreateVersionArgs {
                dataset: "recs".to_string(),
                label: None,
                verification_policy: None,
            })
            .unwrap();
        metadata.update_status(v1.id, VersionStatus::AwaitingEntries, None).unwrap();
        metadata.update_status(v1.id, VersionStatus::Saving, None).unwrap();
        metadata.update_status(v1.id, VersionStatus::Saved, None).unwrap();
        metadata.update_status(v1.id, VersionStatus::Publishing, None).unwrap();
        dispatch(
            &metadata,
            &kv,
            &queue,
            "ops",
            &MessageBody {
                action: Action::Publish,
                version_id: v1.id,
                reason: None,
            },
        )
        .unwrap();
        assert_eq!(metadata.get_version(v1.id).unwrap().unwrap().status, VersionStatus::Published);

        let v2 = metadata
            .create_version(CreateVersionArgs {
                dataset: "recs".to_string(),
                label: None,
                verification_policy: None,
            })
            .unwrap();
        metadata.update_status(v2.id, VersionStatus::AwaitingEntries, None).unwrap();
        metadata.update_status(v2.id, VersionStatus::Saving, None).unwrap();
        metadata.update_status(v2.id, VersionStatus::Saved, None).unwrap();
        metadata.update_status(v2.id, VersionStatus::Publishing, None).unwrap();
        dispatch(
            &metadata,
            &kv,
            &queue,
            "ops",
            &MessageBody {
                action: Action::Publish,
                version_id: v2.id,
                reason: None,
            },
        )
        .unwrap();

        assert_eq!(metadata.get_version(v1.id).unwrap().unwrap().status, VersionStatus::Saved);
        assert_eq!(metadata.get_version(v2.id).unwrap().unwrap().status, VersionStatus::Published);
        let dataset = metadata.get_dataset("recs").unwrap().unwrap();
        assert_eq!(dataset.active_version, Some(v2.id));
    }

    #[test]
    fn publish_is_idempotent_when_the_target_is_already_published() {
        let (metadata, kv, queue) = backends();
        dataset(&metadata, "recs", &["items"]);
        let version = metadata
            .create_version(CreateVersionArgs {
                dataset: "recs".to_string(),
                label: None,
                verification_policy: None,
            })
            .unwrap();
        metadata.update_status(version.id, VersionStatus::AwaitingEntries, None).unwrap();
        metadata.update_status(version.id, VersionStatus::Saving, None).unwrap();
        metadata.update_status(version.id, VersionStatus::Saved, None).unwrap();
        metadata.update_status(version.id, VersionStatus::Publishing, None).unwrap();

        let body = MessageBody {
            action: Action::Publish,
            version_id: version.id,
            reason: None,
        };
        dispatch(&metadata, &kv, &queue, "ops", &body).unwrap();
        // Re-delivery after the message already succeeded once.
        dispatch(&metadata, &kv, &queue, "ops", &body).unwrap();

        assert_eq!(metadata.get_version(version.id).unwrap().unwrap().status, VersionStatus::Published);
    }

    #[test]
    fn save_is_idempotent_when_the_target_is_already_saved() {
        let (metadata, kv, queue) = backends();
        dataset(&metadata, "recs", &["items"]);
        let version = metadata
            .create_version(CreateVersionArgs {
                dataset: "recs".to_string(),
                label: None,
                verification_policy: None,
            })
            .unwrap();
        metadata.update_status(version.id, VersionStatus::AwaitingEntries, None).unwrap();
        metadata.update_status(version.id, VersionStatus::Saving, None).unwrap();

        let body = MessageBody {
            action: Action::Save,
            version_id: version.id,
            reason: None,
        };
        dispatch(&metadata, &kv, &queue, "ops", &body).unwrap();
        // Re-delivery after the message already succeeded once.
        dispatch(&metadata, &kv, &queue, "ops", &body).unwrap();

        assert_eq!(metadata.get_version(version.id).unwrap().unwrap().status, VersionStatus::Saved);
    }

    #[test]
    fn discard_deletes_staged_entries() {
        let (metadata, kv, queue) = backends();
        dataset(&metadata, "recs", &["items"]);
        let version = metadata
            .create_version(CreateVersionArgs {
                dataset: "recs".to_string(),
                label: None,
                verification_policy: None,
            })
            .unwrap();
        metadata.update_status(version.id, VersionStatus::AwaitingEntries, None).unwrap();
        kv.put_entry("recs", version.id, "items", "k1", b"v1".to_vec()).unwrap();

        dispatch(
            &metadata,
            &kv,
            &queue,
            "ops",
            &MessageBody {
                action: Action::Discard,
                version_id: version.id,
                reason: Some("abandoned".to_string()),
            },
        )
        .unwrap();

        assert_eq!(metadata.get_version(version.id).unwrap().unwrap().status, VersionStatus::Discarded);
        assert!(kv.get_entry("recs", version.id, "items", "k1").unwrap().is_none());
    }

    #[test]
    fn verify_data_forwards_a_save_message() {
        let (metadata, kv, queue) = backends();
        dataset(&metadata, "recs", &["items"]);
        let version = metadata
            .create_version(CreateVersionArgs {
                dataset: "recs".to_string(),
                label: None,
                verification_policy: None,
            })
            .unwrap();

        dispatch(
            &metadata,
            &kv,
            &queue,
            "ops",
            &MessageBody {
                action: Action::VerifyData,
                version_id: version.id,
                reason: None,
            },
        )
        .unwrap();

        let pending = queue
            .list(ListFilter {
                topic: "ops".to_string(),
                status: None,
                pid: None,
            })
            .unwrap();
        assert!(pending.iter().any(|m| matches!(m.body.action, Action::Save) && m.body.version_id == version.id));
    }

    proptest::proptest! {
        // Invariant 4 (spec §8): at most one version per dataset is ever
        // `published`, no matter what order a sequence of publishes lands in.
        #[test]
        fn at_most_one_version_is_ever_published(
            order in proptest::collection::vec(0..4usize, 1..12)
        ) {
            let (metadata, kv, queue) = backends();
            dataset(&metadata, "recs", &["items"]);
            let versions: Vec<_> = (0..4)
                .map(|_| {
                    let v = metadata
                        .create_version(CreateVersionArgs {
                            dataset: "recs".to_string(),
                            label: None,
                            verification_policy: None,
                        })
                        .unwrap();
                    metadata.update_status(v.id, VersionStatus::AwaitingEntries, None).unwrap();
                    metadata.update_status(v.id, VersionStatus::Saving, None).unwrap();
                    metadata.update_status(v.id, VersionStatus::Saved, None).unwrap();
                    v
                })
                .collect();

            for index in order {
                let version = &versions[index];
                if metadata.get_version(version.id).unwrap().unwrap().status != VersionStatus::Saved {
                    continue;
                }
                metadata.update_status(version.id, VersionStatus::Publishing, None).unwrap();
                dispatch(
                    &metadata,
                    &kv,
                    &queue,
                    "ops",
                    &MessageBody {
                        action: Action::Publish,
                        version_id: version.id,
                        reason: None,
                    },
                )
                .unwrap();

                let published = versions
                    .iter()
                    .filter(|v| metadata.get_version(v.id).unwrap().unwrap().status == VersionStatus::Published)
                    .count();
                prop_assert!(published <= 1);
            }
        }
    }
}
