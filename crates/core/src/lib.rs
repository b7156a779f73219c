//! Core types and traits for the versioned key-value store.
//!
//! This crate defines the foundational, storage-agnostic vocabulary used
//! throughout the system:
//! - [`types`]: opaque identifiers and the `web-safe` string predicate.
//! - [`contract`]: wire-level entities (`Dataset`, `Version`, `QueueMessage`, ...).
//! - [`traits`]: the three backend contracts (`MetadataStore`, `KvStore`, `Queue`).
//! - [`error`]: the unified error type and its HTTP status mapping.
//! - [`limits`]: implementation-chosen size and timing constants.

#![warn(missing_docs)]

pub mod contract;
pub mod error;
pub mod limits;
pub mod traits;
pub mod types;

pub use contract::{
    Action, AuditRecord, ContentType, CreateDatasetArgs, CreateVersionArgs, Dataset, EntryKey,
    EvictionPolicy, LoadRow, MessageBody, MessageStatus, OperationLog, QueueMessage, Version,
    VersionStatus,
};
pub use error::{Error, ErrorDetail, ErrorKind, Result};
pub use traits::{KvStore, ListFilter, MetadataStore, Queue};
pub use types::{is_web_safe, MessageId, VersionId};
