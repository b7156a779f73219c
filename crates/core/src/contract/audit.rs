//! Append-only audit log shared by datasets and versions (spec invariant 7).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::BTreeMap;

/// One entry in an `operation-log`.
///
/// Every successful mutation appends exactly one of these. `action` names
/// the mutation (`created`, `status-changed`, `activated`, ...); the
/// remaining fields are whatever the caller passed as the `audit` map,
/// merged in verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditRecord {
    /// What happened.
    pub action: String,
    /// When it happened.
    pub timestamp: DateTime<Utc>,
    /// Caller-supplied audit context, merged flat into the record.
    #[serde(flatten)]
    pub context: BTreeMap<String, Json>,
}

impl AuditRecord {
    /// Build a record for `action` that happened `now`, merging in `audit`.
    pub fn new(action: impl Into<String>, audit: Option<BTreeMap<String, Json>>) -> Self {
        AuditRecord {
            action: action.into(),
            timestamp: Utc::now(),
            context: audit.unwrap_or_default(),
        }
    }
}

/// An append-only sequence of [`AuditRecord`]s.
pub type OperationLog = Vec<AuditRecord>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_merges_supplied_audit_context() {
        let mut audit = BTreeMap::new();
        audit.insert("initiated-by".to_string(), Json::from("publish-handler"));
        let record = AuditRecord::new("status-changed", Some(audit));
        assert_eq!(record.action, "status-changed");
        assert_eq!(
            record.context.get("initiated-by"),
            Some(&Json::from("publish-handler"))
        );
    }

    #[test]
    fn new_record_with_no_audit_has_empty_context() {
        let record = AuditRecord::new("created", None);
        assert!(record.context.is_empty());
    }
}
