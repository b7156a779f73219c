//! The `Dataset` entity (spec §3).

use super::audit::OperationLog;
use crate::types::{is_web_safe, VersionId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Only `application/json` is recognized (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentType {
    /// The only recognized content type.
    ApplicationJson,
}

impl Default for ContentType {
    fn default() -> Self {
        ContentType::ApplicationJson
    }
}

/// `{type: keep-last-x-versions, versions: N}` — eviction is out of scope
/// for the core (spec §1 Non-goals); the policy round-trips but nothing
/// acts on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum EvictionPolicy {
    /// Retain the most recent `versions` versions; never enforced by this core.
    KeepLastXVersions {
        /// How many versions to retain.
        versions: u32,
    },
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        EvictionPolicy::KeepLastXVersions { versions: 5 }
    }
}

/// A named collection of tables (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    /// Unique, web-safe, non-empty. Doubles as the dataset's id.
    pub name: String,
    /// Non-empty, immutable after creation.
    pub tables: BTreeSet<String>,
    /// Fixed to `application/json` for now.
    pub content_type: ContentType,
    /// Eviction policy, round-tripped but not enforced.
    pub eviction_policy: EvictionPolicy,
    /// The currently published version, or the most recently published one
    /// now `saved`, per invariant 5. `None` until the first publish.
    pub active_version: Option<VersionId>,
    /// Append-only audit trail.
    pub operation_log: OperationLog,
    /// Monotonic CAS counter (`__ver` in spec parlance).
    pub cas: u64,
}

/// Validated arguments to `create-dataset`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDatasetArgs {
    /// Proposed dataset name.
    pub name: String,
    /// Proposed table names, as given on the wire. A `Vec` rather than a
    /// `BTreeSet` so [`Self::validate`] can reject duplicate entries instead
    /// of silently collapsing them.
    pub tables: Vec<String>,
    /// Defaults to `keep-last-x-versions` with a small retention count.
    #[serde(default)]
    pub eviction_policy: Option<EvictionPolicy>,
}

impl CreateDatasetArgs {
    /// Validate name and table-name shape (spec §4.1: "schema validation is
    /// part of the contract"). Does not check the dataset name for
    /// uniqueness — that is the store's job, since only the store knows what
    /// already exists.
    pub fn validate(&self) -> Result<(), String> {
        if !is_web_safe(&self.name) {
            return Err(format!("dataset name {:?} is not web-safe", self.name));
        }
        if self.tables.is_empty() {
            return Err("dataset must declare at least one table".to_string());
        }
        for table in &self.tables {
            if !is_web_safe(table) {
                return Err(format!("table name {:?} is not web-safe", table));
            }
        }
        let mut seen = BTreeSet::new();
        for table in &self.tables {
            if !seen.insert(table) {
                return Err(format!("duplicate table name {table:?}"));
            }
        }
        Ok(())
    }

    /// The validated table set, deduplicated. Call after [`Self::validate`]
    /// has confirmed there were no duplicates to collapse.
    pub fn table_set(&self) -> BTreeSet<String> {
        self.tables.iter().cloned().collect()
    }
}
