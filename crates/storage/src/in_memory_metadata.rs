//! The in-memory `MetadataStore` backend: a pair of `DashMap`s guarded by
//! per-entry CAS counters, no external dependency required.

use chrono::Utc;
use dashmap::mapref::entry::Entry as DashEntry;
use dashmap::DashMap;
use std::collections::BTreeMap;
use vkv_concurrency::cas;
use vkv_core::contract::{AuditRecord, CreateDatasetArgs, CreateVersionArgs, Dataset, Version};
use vkv_core::types::VersionId;
use vkv_core::{Error, MetadataStore, Result, VersionStatus};
use serde_json::Value as Json;

/// An in-process `MetadataStore`. Suitable for tests and single-node
/// deployments; state does not survive a restart.
#[derive(Default)]
pub struct InMemoryMetadataStore {
    datasets: DashMap<String, Dataset>,
    versions: DashMap<VersionId, Version>,
}

impl InMemoryMetadataStore {
    /// An empty store.
    pub fn new() -> Self {
        InMemoryMetadataStore::default()
    }
}

impl MetadataStore for InMemoryMetadataStore {
    fn create_dataset(&self, args: CreateDatasetArgs) -> Result<Dataset> {
        args.validate()
            .map_err(|message| Error::validation("invalid-dataset-args", message))?;
        let tables = args.table_set();
        match self.datasets.entry(args.name.clone()) {
            DashEntry::Occupied(_) => Err(Error::conflict(format!(
                "dataset {:?} already exists",
                args.name
            ))),
            DashEntry::Vacant(slot) => {
                let dataset = Dataset {
                    name: args.name,
                    tables,
                    content_type: Default::default(),
                    eviction_policy: args.eviction_policy.unwrap_or_default(),
                    active_version: None,
                    operation_log: vec![AuditRecord::new("created", None)],
                    cas: 0,
                };
                slot.insert(dataset.clone());
                Ok(dataset)
            }
        }
    }

    fn get_dataset(&self, name: &str) -> Result<Option<Dataset>> {
        Ok(self.datasets.get(name).map(|r| r.value().clone()))
    }

    fn list_datasets(&self) -> Result<Vec<Dataset>> {
        Ok(self.datasets.iter().map(|r| r.value().clone()).collect())
    }

    fn create_version(&self, args: CreateVersionArgs) -> Result<Version> {
        args.validate()
            .map_err(|message| Error::validation("invalid-version-args", message))?;
        if self.get_dataset(&args.dataset)?.is_none() {
            return Err(Error::not_found(
                "unknown-dataset",
                format!("dataset {:?} does not exist", args.dataset),
            ));
        }
        let version = Version {
            id: VersionId::new(),
            label: args.label,
            dataset: args.dataset,
            status: VersionStatus::INITIAL,
            verification_policy: args.verification_policy,
            operation_log: vec![AuditRecord::new("created", None)],
            cas: 0,
        };
        self.versions.insert(version.id, version.clone());
        Ok(version)
    }

    fn list_versions_by_dataset(&self, dataset: &str) -> Result<Vec<Version>> {
        Ok(self
            .versions
            .iter()
            .filter(|r| r.value().dataset == dataset)
            .map(|r| r.value().clone())
            .collect())
    }

    fn list_all_versions(&self) -> Result<Vec<Version>> {
        Ok(self.versions.iter().map(|r| r.value().clone()).collect())
    }

    fn get_version(&self, id: VersionId) -> Result<Option<Version>> {
        Ok(self.versions.get(&id).map(|r| r.value().clone()))
    }

    fn update_status(
        &self,
        version_id: VersionId,
        target: VersionStatus,
        audit: Option<BTreeMap<String, Json>>,
    ) -> Result<Version> {
        let mut version = self.get_version(version_id)?.ok_or_else(|| {
            Error::not_found("unknown-version", format!("no such version {version_id}"))
        })?;
        if !version.status.can_transition_to(target) {
            return Err(Error::validation(
                "invalid-transition",
                format!(
                    "cannot move version {version_id} from {} to {target}",
                    version.status
                ),
            ));
        }
        let expected_cas = version.cas;
        version.status = target;
        version.cas = cas::advance(version.cas);
        version.operation_log.push(AuditRecord::new(
            format!("status-changed:{target}"),
            audit,
        ));

        let mut entry = self.versions.get_mut(&version_id).ok_or_else(|| {
            Error::not_found("unknown-version", format!("no such version {version_id}"))
        })?;
        cas::check(expected_cas, entry.cas)?;
        *entry = version.clone();
        Ok(version)
    }

    fn activate_version(&self, version_id: VersionId) -> Result<Dataset> {
        let version = self.get_version(version_id)?.ok_or_else(|| {
            Error::not_found("unknown-version", format!("no such version {version_id}"))
        })?;
        if version.status != VersionStatus::Published {
            return Err(Error::validation(
                "version-not-published",
                format!(
                    "version {version_id} must be published before it can be activated, is {}",
                    version.status
                ),
            ));
        }
        let mut dataset = self.datasets.get_mut(&version.dataset).ok_or_else(|| {
            Error::not_found(
                "unknown-dataset",
                format!("no such dataset {:?}", version.dataset),
            )
        })?;
        dataset.active_version = Some(version_id);
        dataset.cas = cas::advance(dataset.cas);
        let mut audit = BTreeMap::new();
        audit.insert("version-id".to_string(), Json::from(version_id.to_string()));
        audit.insert("at".to_string(), Json::from(Utc::now().to_rfc3339()));
        dataset
            .operation_log
            .push(AuditRecord::new("activated", Some(audit)));
        Ok(dataset.clone())
    }
}
