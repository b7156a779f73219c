//! Concurrency primitives shared by every backend: CAS discipline, lease
//! deadline arithmetic, and the read-through TTL cache in front of
//! `get-dataset`.

#![warn(missing_docs)]

pub mod cas;
pub mod lease;
pub mod ttl_cache;

pub use ttl_cache::TtlCache;
