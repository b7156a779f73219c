//! Remote document-store backend implementations of the three store
//! contracts, reached over a blocking HTTP client (spec §1 Non-goal list:
//! "an in-memory reference and a remote document-store impl both suffice").

#![warn(missing_docs)]

mod client;
mod kv;
mod metadata;
mod queue;

pub use client::{RemoteConfig, RemoteDocStoreClient};
pub use kv::RemoteKvStore;
pub use metadata::RemoteMetadataStore;
pub use queue::RemoteQueue;
