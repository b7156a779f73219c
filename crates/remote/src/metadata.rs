//! `MetadataStore` backed by the remote document store.

use crate::client::RemoteDocStoreClient;
use std::collections::BTreeMap;
use vkv_concurrency::cas;
use vkv_core::contract::{AuditRecord, CreateDatasetArgs, CreateVersionArgs, Dataset, Version};
use vkv_core::types::VersionId;
use vkv_core::{Error, MetadataStore, Result, VersionStatus};
use serde_json::Value as Json;

const DATASETS: &str = "datasets";
const VERSIONS: &str = "versions";

/// A `MetadataStore` whose records live in a remote document store,
/// reached over HTTP.
pub struct RemoteMetadataStore {
    client: RemoteDocStoreClient,
}

impl RemoteMetadataStore {
    /// Wrap an already-configured client.
    pub fn new(client: RemoteDocStoreClient) -> Self {
        RemoteMetadataStore { client }
    }
}

fn to_doc<T: serde::Serialize>(value: &T) -> Result<Json> {
    serde_json::to_value(value).map_err(|e| Error::internal(format!("serialize failed: {e}")))
}

fn from_doc<T: serde::de::DeserializeOwned>(doc: Json) -> Result<T> {
    serde_json::from_value(doc).map_err(|e| Error::internal(format!("deserialize failed: {e}")))
}

impl MetadataStore for RemoteMetadataStore {
    fn create_dataset(&self, args: CreateDatasetArgs) -> Result<Dataset> {
        args.validate()
            .map_err(|message| Error::validation("invalid-dataset-args", message))?;
        let dataset = Dataset {
            name: args.name.clone(),
            tables: args.table_set(),
            content_type: Default::default(),
            eviction_policy: args.eviction_policy.unwrap_or_default(),
            active_version: None,
            operation_log: vec![AuditRecord::new("created", None)],
            cas: 0,
        };
        self.client
            .create(DATASETS, &dataset.name, &to_doc(&dataset)?)?;
        Ok(dataset)
    }

    fn get_dataset(&self, name: &str) -> Result<Option<Dataset>> {
        match self.client.get(DATASETS, name)? {
            Some(doc) => Ok(Some(from_doc(doc)?)),
            None => Ok(None),
        }
    }

    fn list_datasets(&self) -> Result<Vec<Dataset>> {
        self.client
            .query_prefix(DATASETS, "")?
            .into_iter()
            .map(|(_, doc)| from_doc(doc))
            .collect()
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
        self.client
            .create(VERSIONS, &version.id.to_string(), &to_doc(&version)?)?;
        Ok(version)
    }

    fn list_versions_by_dataset(&self, dataset: &str) -> Result<Vec<Version>> {
        let all: Vec<Version> = self
            .client
            .query_prefix(VERSIONS, "")?
            .into_iter()
            .map(|(_, doc)| from_doc(doc))
            .collect::<Result<Vec<_>>>()?;
        Ok(all.into_iter().filter(|v| v.dataset == dataset).collect())
    }

    fn list_all_versions(&self) -> Result<Vec<Version>> {
        self.client
            .query_prefix(VERSIONS, "")?
            .into_iter()
            .map(|(_, doc)| from_doc(doc))
            .collect()
    }

    fn get_version(&self, id: VersionId) -> Result<Option<Version>> {
        match self.client.get(VERSIONS, &id.to_string())? {
            Some(doc) => Ok(Some(from_doc(doc)?)),
            None => Ok(None),
        }
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
        version
            .operation_log
            .push(AuditRecord::new(format!("status-changed:{target}"), audit));
        self.client.put_if_match(
            VERSIONS,
            &version_id.to_string(),
            &to_doc(&version)?,
            expected_cas,
        )?;
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
        let mut dataset = self.get_dataset(&version.dataset)?.ok_or_else(|| {
            Error::not_found(
                "unknown-dataset",
                format!("no such dataset {:?}", version.dataset),
            )
        })?;
        let expected_cas = dataset.cas;
        dataset.active_version = Some(version_id);
        dataset.cas = cas::advance(dataset.cas);
        let mut audit = BTreeMap::new();
        audit.insert("version-id".to_string(), Json::from(version_id.to_string()));
        dataset
            .operation_log
            .push(AuditRecord::new("activated", Some(audit)));
        self.client
            .put_if_match(DATASETS, &dataset.name.clone(), &to_doc(&dataset)?, expected_cas)?;
        Ok(dataset)
    }
}
