//! The `Version` entity (spec §3) — an immutable staging area for one
//! dataset, whose `status` walks the graph defined in [`super::version_status`].

use super::audit::OperationLog;
use super::version_status::VersionStatus;
use crate::types::VersionId;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// One staged snapshot of a dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Version {
    /// Opaque, unique, assigned at creation.
    pub id: VersionId,
    /// Optional human label.
    pub label: Option<String>,
    /// Name of the owning dataset; immutable after creation.
    pub dataset: String,
    /// Current lifecycle state.
    pub status: VersionStatus,
    /// Opaque configuration, round-tripped but unused by this core.
    pub verification_policy: Option<Json>,
    /// Append-only audit trail.
    pub operation_log: OperationLog,
    /// Monotonic CAS counter (`__ver`).
    pub cas: u64,
}

/// Validated arguments to `create-version`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateVersionArgs {
    /// Owning dataset name; must already exist.
    pub dataset: String,
    /// Optional human label; if present, must be non-empty.
    #[serde(default)]
    pub label: Option<String>,
    /// Opaque configuration, round-tripped only.
    #[serde(default)]
    pub verification_policy: Option<Json>,
}

impl CreateVersionArgs {
    /// Schema-level validation only; dataset existence is the store's job.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(label) = &self.label {
            if label.is_empty() {
                return Err("label, if present, must be non-empty".to_string());
            }
        }
        Ok(())
    }
}
