//! Wire-level entity and request types shared by every backend and the
//! orchestrator. Nothing in this module talks to storage; it only defines
//! shapes and their schema-level validation.

mod audit;
mod dataset;
mod entry;
mod queue_message;
mod version;
mod version_status;

pub use audit::{AuditRecord, OperationLog};
pub use dataset::{ContentType, CreateDatasetArgs, Dataset, EvictionPolicy};
pub use entry::{EntryKey, LoadRow};
pub use queue_message::{Action, MessageBody, MessageStatus, QueueMessage};
pub use version::{CreateVersionArgs, Version};
pub use version_status::VersionStatus;
